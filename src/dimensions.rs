//! Closed code → name dimensions from the TLC data dictionary.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RateCode {
    Standard,
    Jfk,
    Newark,
    NassauOrWestchester,
    NegotiatedFare,
    GroupRide,
    Undefined,
}

impl RateCode {
    pub const ALL: [RateCode; 7] = [
        RateCode::Standard,
        RateCode::Jfk,
        RateCode::Newark,
        RateCode::NassauOrWestchester,
        RateCode::NegotiatedFare,
        RateCode::GroupRide,
        RateCode::Undefined,
    ];

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(RateCode::Standard),
            2 => Some(RateCode::Jfk),
            3 => Some(RateCode::Newark),
            4 => Some(RateCode::NassauOrWestchester),
            5 => Some(RateCode::NegotiatedFare),
            6 => Some(RateCode::GroupRide),
            99 => Some(RateCode::Undefined),
            _ => None,
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            RateCode::Standard => 1,
            RateCode::Jfk => 2,
            RateCode::Newark => 3,
            RateCode::NassauOrWestchester => 4,
            RateCode::NegotiatedFare => 5,
            RateCode::GroupRide => 6,
            RateCode::Undefined => 99,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            RateCode::Standard => "Standard rate",
            RateCode::Jfk => "JFK",
            RateCode::Newark => "Newark",
            RateCode::NassauOrWestchester => "Nassau or Westchester",
            RateCode::NegotiatedFare => "Negotiated fare",
            RateCode::GroupRide => "Group ride",
            RateCode::Undefined => "Undefined",
        }
    }
}

impl fmt::Display for RateCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentType {
    CreditCard,
    Cash,
    NoCharge,
    Dispute,
    Unknown,
    VoidedTrip,
}

impl PaymentType {
    pub const ALL: [PaymentType; 6] = [
        PaymentType::CreditCard,
        PaymentType::Cash,
        PaymentType::NoCharge,
        PaymentType::Dispute,
        PaymentType::Unknown,
        PaymentType::VoidedTrip,
    ];

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(PaymentType::CreditCard),
            2 => Some(PaymentType::Cash),
            3 => Some(PaymentType::NoCharge),
            4 => Some(PaymentType::Dispute),
            5 => Some(PaymentType::Unknown),
            6 => Some(PaymentType::VoidedTrip),
            _ => None,
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            PaymentType::CreditCard => 1,
            PaymentType::Cash => 2,
            PaymentType::NoCharge => 3,
            PaymentType::Dispute => 4,
            PaymentType::Unknown => 5,
            PaymentType::VoidedTrip => 6,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            PaymentType::CreditCard => "Credit card",
            PaymentType::Cash => "Cash",
            PaymentType::NoCharge => "No charge",
            PaymentType::Dispute => "Dispute",
            // "Unknown" is a real category here, not an unresolved code
            PaymentType::Unknown => "Unknown",
            PaymentType::VoidedTrip => "Voided trip",
        }
    }
}

impl fmt::Display for PaymentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Rate code → display name, `None` when the code is outside the enumeration.
pub fn rate_code_name(code: i64) -> Option<&'static str> {
    RateCode::from_code(code).map(|r| r.display_name())
}

/// Payment type → display name, `None` when the code is outside the enumeration.
pub fn payment_type_name(code: i64) -> Option<&'static str> {
    PaymentType::from_code(code).map(|p| p.display_name())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_code_lookup() {
        assert_eq!(rate_code_name(1), Some("Standard rate"));
        assert_eq!(rate_code_name(2), Some("JFK"));
        assert_eq!(rate_code_name(99), Some("Undefined"));
        assert_eq!(rate_code_name(7), None);
        assert_eq!(rate_code_name(0), None);
    }

    #[test]
    fn test_payment_type_lookup() {
        assert_eq!(payment_type_name(1), Some("Credit card"));
        assert_eq!(payment_type_name(6), Some("Voided trip"));
        assert_eq!(payment_type_name(7), None);
        assert_eq!(payment_type_name(99), None);
    }

    #[test]
    fn test_codes_round_trip_through_enumeration() {
        for rate in RateCode::ALL {
            assert_eq!(RateCode::from_code(rate.code()), Some(rate));
        }
        for payment in PaymentType::ALL {
            assert_eq!(PaymentType::from_code(payment.code()), Some(payment));
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(RateCode::NassauOrWestchester.to_string(), "Nassau or Westchester");
        assert_eq!(PaymentType::NoCharge.to_string(), "No charge");
    }
}
