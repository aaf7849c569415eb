use crate::error::ChatError;

/// Identity of one conversation: a grouping key over messages, never a
/// stored row. One ad plus one buyer; the seller and every buyer converge on
/// the same key, distinct buyers on the same ad get distinct keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConversationId(String);

impl ConversationId {
    pub fn new(ad_id: i64, buyer_id: &str) -> Self {
        Self(format!("ad_{ad_id}_u_{buyer_id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The two valid members of a conversation, sorted into their market roles.
#[derive(Debug, Clone)]
pub struct Participants {
    pub seller_id: String,
    pub buyer_id: String,
}

/// Checks the seller/buyer rule: both ids non-empty, distinct, and exactly
/// one of them the ad owner.
pub fn validate_participants(owner_id: &str, a: &str, b: &str) -> Result<Participants, ChatError> {
    if a.trim().is_empty() || b.trim().is_empty() || a == b {
        return Err(ChatError::InvalidParticipants);
    }

    let a_is_seller = a == owner_id;
    let b_is_seller = b == owner_id;
    if a_is_seller == b_is_seller {
        return Err(ChatError::InvalidParticipants);
    }

    let (seller, buyer) = if a_is_seller { (a, b) } else { (b, a) };
    Ok(Participants {
        seller_id: seller.to_string(),
        buyer_id: buyer.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_key_regardless_of_argument_order() {
        let ab = validate_participants("seller", "seller", "buyer").unwrap();
        let ba = validate_participants("seller", "buyer", "seller").unwrap();

        assert_eq!(
            ConversationId::new(7, &ab.buyer_id),
            ConversationId::new(7, &ba.buyer_id)
        );
    }

    #[test]
    fn distinct_buyers_get_distinct_keys() {
        let x = validate_participants("seller", "seller", "buyer-x").unwrap();
        let y = validate_participants("seller", "seller", "buyer-y").unwrap();

        assert_ne!(
            ConversationId::new(7, &x.buyer_id),
            ConversationId::new(7, &y.buyer_id)
        );
    }

    #[test]
    fn key_format_is_stable() {
        let id = ConversationId::new(42, "u2");
        assert_eq!(id.as_str(), "ad_42_u_u2");
    }

    #[test]
    fn rejects_equal_participants() {
        let err = validate_participants("seller", "seller", "seller").unwrap_err();
        assert!(matches!(err, ChatError::InvalidParticipants));
    }

    #[test]
    fn rejects_when_neither_is_the_owner() {
        let err = validate_participants("seller", "buyer-x", "buyer-y").unwrap_err();
        assert!(matches!(err, ChatError::InvalidParticipants));
    }

    #[test]
    fn rejects_blank_ids() {
        assert!(validate_participants("seller", "", "seller").is_err());
        assert!(validate_participants("seller", "seller", "  ").is_err());
    }

    #[test]
    fn sorts_roles_from_either_side() {
        let p = validate_participants("s1", "b1", "s1").unwrap();
        assert_eq!(p.seller_id, "s1");
        assert_eq!(p.buyer_id, "b1");
    }
}
