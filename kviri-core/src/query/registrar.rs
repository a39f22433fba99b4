//! The pending-name protocol shared by FROM/IN, LET/BE and JOIN/IN.

use crate::error::{Clause, KviriError, KviriResult};

/// At most one name waits for its value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) enum PendingName {
    #[default]
    Idle,
    Pending { name: String, opened_by: Clause },
}

impl PendingName {
    /// Register `name` as waiting for a value.
    pub(crate) fn open(&mut self, clause: Clause, name: &str) -> KviriResult<()> {
        if name.trim().is_empty() {
            return Err(KviriError::usage(clause, "name must not be empty"));
        }
        if let PendingName::Pending { name: waiting, opened_by } = self {
            return Err(KviriError::usage(
                clause,
                format!(
                    "cannot register '{}': '{}' from {} is still waiting for a value",
                    name, waiting, opened_by
                ),
            ));
        }
        *self = PendingName::Pending {
            name: name.trim().to_string(),
            opened_by: clause,
        };
        Ok(())
    }

    /// Take the waiting name if `clause` may consume a name opened by its
    /// opener. A mismatched or missing opener is a Usage error and leaves the
    /// state unchanged; otherwise the state is Idle afterwards, whether or not
    /// the caller goes on to bind the name.
    pub(crate) fn take(
        &mut self,
        clause: Clause,
        accepts: &[Clause],
    ) -> KviriResult<(String, Clause)> {
        match self {
            PendingName::Idle => {
                return Err(KviriError::usage(clause, "no name is waiting for a value"))
            }
            PendingName::Pending { name, opened_by } if !accepts.contains(opened_by) => {
                return Err(KviriError::usage(
                    clause,
                    format!("cannot consume '{}' registered by {}", name, opened_by),
                ))
            }
            PendingName::Pending { .. } => {}
        }
        match std::mem::take(self) {
            PendingName::Pending { name, opened_by } => Ok((name, opened_by)),
            PendingName::Idle => Err(KviriError::usage(clause, "no name is waiting for a value")),
        }
    }

    pub(crate) fn name(&self) -> Option<&str> {
        match self {
            PendingName::Idle => None,
            PendingName::Pending { name, .. } => Some(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_then_consume() {
        let mut pending = PendingName::default();
        pending.open(Clause::From, "x").unwrap();
        assert_eq!(pending.name(), Some("x"));

        let (name, opened_by) = pending.take(Clause::In, &[Clause::From]).unwrap();
        assert_eq!((name.as_str(), opened_by), ("x", Clause::From));
        assert_eq!(pending, PendingName::Idle);
    }

    #[test]
    fn test_open_twice_is_usage_error() {
        let mut pending = PendingName::default();
        pending.open(Clause::From, "x").unwrap();
        let err = pending.open(Clause::Let, "y").unwrap_err();
        assert_eq!(err.clause(), Clause::Let);
        // the first name is kept
        assert_eq!(pending.name(), Some("x"));
    }

    #[test]
    fn test_consume_without_name() {
        let mut pending = PendingName::default();
        let err = pending.take(Clause::Be, &[Clause::Let]).unwrap_err();
        assert!(matches!(err, KviriError::Usage { clause: Clause::Be, .. }));
    }

    #[test]
    fn test_mismatched_consumer() {
        let mut pending = PendingName::default();
        pending.open(Clause::Let, "z").unwrap();
        let err = pending
            .take(Clause::In, &[Clause::From, Clause::Join])
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Usage error in IN: cannot consume 'z' registered by LET"
        );
        assert_eq!(pending.name(), Some("z"));
    }

    #[test]
    fn test_empty_name() {
        let mut pending = PendingName::default();
        assert!(pending.open(Clause::From, "  ").is_err());
        assert_eq!(pending, PendingName::Idle);
    }
}
