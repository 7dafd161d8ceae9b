// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Core value types: currencies, denominations, and opaque identifiers.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize, de, ser};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Currencies the machine can stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Rub,
    Usd,
    Eur,
}

impl Currency {
    pub fn code(&self) -> &'static str {
        match self {
            Currency::Rub => "RUB",
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::Rub => "₽",
            Currency::Usd => "$",
            Currency::Eur => "€",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Error parsing a currency code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown currency code")]
pub struct ParseCurrencyError;

impl FromStr for Currency {
    type Err = ParseCurrencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "RUB" => Ok(Currency::Rub),
            "USD" => Ok(Currency::Usd),
            "EUR" => Ok(Currency::Eur),
            _ => Err(ParseCurrencyError),
        }
    }
}

/// One kind of banknote: a currency plus a face value.
///
/// Immutable, compared by value, and used as the inventory map key.
/// The face value is a strictly positive integer in the currency's
/// customary unit.
///
/// Serializes as its display string (e.g. `"1000 RUB"`) so that
/// `Denomination -> count` maps survive formats with string-only keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Denomination {
    currency: Currency,
    face_value: u32,
}

impl Denomination {
    /// Creates a denomination.
    ///
    /// # Panics
    ///
    /// Panics if `face_value` is zero.
    pub fn new(currency: Currency, face_value: u32) -> Self {
        assert!(face_value > 0, "denomination face value must be positive");
        Self {
            currency,
            face_value,
        }
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    pub fn face_value(&self) -> u32 {
        self.face_value
    }

    /// Face value as a decimal amount.
    pub fn value(&self) -> Decimal {
        Decimal::from(self.face_value)
    }
}

impl fmt::Display for Denomination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.face_value, self.currency)
    }
}

/// Error parsing a denomination literal such as `"1000 RUB"`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid denomination literal (expected e.g. \"1000 RUB\")")]
pub struct ParseDenominationError;

impl FromStr for Denomination {
    type Err = ParseDenominationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let face = parts.next().ok_or(ParseDenominationError)?;
        let currency = parts.next().ok_or(ParseDenominationError)?;
        if parts.next().is_some() {
            return Err(ParseDenominationError);
        }
        let face_value: u32 = face.parse().map_err(|_| ParseDenominationError)?;
        if face_value == 0 {
            return Err(ParseDenominationError);
        }
        let currency = currency.parse().map_err(|_| ParseDenominationError)?;
        Ok(Denomination {
            currency,
            face_value,
        })
    }
}

impl Serialize for Denomination {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: ser::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Denomination {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: de::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// Caller-supplied identifier that ties a withdrawal to its originating
/// session. Must be unique per request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct CorrelationId(pub String);

impl CorrelationId {
    /// Generates a fresh random correlation id for callers that omit one.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CorrelationId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Opaque token redeemable once for a reservation's held notes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct ClaimCode(pub String);

impl ClaimCode {
    /// Generates a claim code: `QR-` plus twelve uppercase hex characters.
    pub fn generate() -> Self {
        let hex = Uuid::new_v4().simple().to_string();
        Self(format!("QR-{}", hex[..12].to_uppercase()))
    }
}

impl fmt::Display for ClaimCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClaimCode {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}
