use serde::{Deserialize, Serialize};

use stockflow_core::{OrderKind, OrderStatus};

/// Client order status lifecycle.
///
/// `pending -> {approved, rejected}`; both outcomes are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientOrderStatus {
    Pending,
    Approved,
    Rejected,
}

impl OrderStatus for ClientOrderStatus {
    const KIND: OrderKind = OrderKind::Client;
    const INITIAL: Self = ClientOrderStatus::Pending;
    const APPROVED: Self = ClientOrderStatus::Approved;

    fn as_str(self) -> &'static str {
        match self {
            ClientOrderStatus::Pending => "pending",
            ClientOrderStatus::Approved => "approved",
            ClientOrderStatus::Rejected => "rejected",
        }
    }

    fn all() -> &'static [Self] {
        &[
            ClientOrderStatus::Pending,
            ClientOrderStatus::Approved,
            ClientOrderStatus::Rejected,
        ]
    }

    fn successors(self) -> &'static [Self] {
        match self {
            ClientOrderStatus::Pending => {
                &[ClientOrderStatus::Approved, ClientOrderStatus::Rejected]
            }
            ClientOrderStatus::Approved | ClientOrderStatus::Rejected => &[],
        }
    }
}

impl core::fmt::Display for ClientOrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use stockflow_core::DomainError;

    #[test]
    fn pending_can_be_approved_or_rejected() {
        assert!(ClientOrderStatus::Pending.can_transition_to(ClientOrderStatus::Approved));
        assert!(ClientOrderStatus::Pending.can_transition_to(ClientOrderStatus::Rejected));
    }

    #[test]
    fn outcomes_are_terminal() {
        let err = ClientOrderStatus::Rejected
            .check_transition(ClientOrderStatus::Approved)
            .unwrap_err();
        assert_eq!(
            err,
            DomainError::InvalidTransition {
                from: "rejected",
                to: "approved"
            }
        );
        assert!(!ClientOrderStatus::Approved.can_transition_to(ClientOrderStatus::Pending));
    }

    #[test]
    fn reapproval_is_a_valid_self_transition_without_entering_approved() {
        let approved = ClientOrderStatus::Approved;
        assert!(approved.check_transition(approved).is_ok());
        assert!(!approved.enters(approved, ClientOrderStatus::APPROVED));
        assert!(ClientOrderStatus::Pending.enters(approved, ClientOrderStatus::APPROVED));
    }

    #[test]
    fn parse_is_exact_and_rejects_unknown_values() {
        assert_eq!(ClientOrderStatus::parse("approved").unwrap(), ClientOrderStatus::Approved);
        for bad in ["bogus", "Approved", "shipped", ""] {
            match ClientOrderStatus::parse(bad) {
                Err(DomainError::Validation(_)) => {}
                other => panic!("expected validation error for {bad:?}, got {other:?}"),
            }
        }
    }

    fn any_status() -> impl Strategy<Value = ClientOrderStatus> {
        prop::sample::select(ClientOrderStatus::all().to_vec())
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: every status reachable by a sequence of accepted transitions
        /// stays inside the enumeration, and approval is entered at most once.
        #[test]
        fn approval_is_entered_at_most_once(
            requests in prop::collection::vec(any_status(), 0..20)
        ) {
            let mut current = ClientOrderStatus::INITIAL;
            let mut approvals = 0;
            for next in requests {
                if current.check_transition(next).is_ok() {
                    if current.enters(next, ClientOrderStatus::APPROVED) {
                        approvals += 1;
                    }
                    current = next;
                }
                prop_assert!(ClientOrderStatus::all().contains(&current));
            }
            prop_assert!(approvals <= 1);
        }

        #[test]
        fn as_str_round_trips_through_parse(status in any_status()) {
            prop_assert_eq!(ClientOrderStatus::parse(status.as_str()).unwrap(), status);
        }
    }
}
