use diesel::{r2d2::ConnectionManager, SqliteConnection};
use rust_decimal::prelude::*;
use rust_decimal_macros::*;

use std::fmt;

use serde::{Deserialize, Serialize};

pub const SATS_IN_BITCOIN: Decimal = dec!(100000000);
pub const CENTS_IN_DOLLAR: Decimal = dec!(100);

pub type UserId = String;
pub type DepositId = String;
pub type TxId = i64;

pub type DbPool = diesel::r2d2::Pool<ConnectionManager<SqliteConnection>>;

/// Currencies a balance can be held in. Amounts are always stored in the
/// smallest unit of the currency: satoshis for BTC, cents for USDT.
#[derive(Debug, PartialEq, Clone, Copy, Serialize, Deserialize, Eq, Hash)]
pub enum Currency {
    BTC,
    USDT,
}

impl Currency {
    pub const ALL: [Currency; 2] = [Currency::BTC, Currency::USDT];

    /// Number of decimal places between the major unit and the stored minor unit.
    pub fn dp(&self) -> u32 {
        match self {
            Currency::BTC => 8,
            Currency::USDT => 2,
        }
    }

    /// Value persisted in the `currency` columns.
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::BTC => "btc",
            Currency::USDT => "usdt",
        }
    }

    pub fn minor_unit(&self) -> &'static str {
        match self {
            Currency::BTC => "sats",
            Currency::USDT => "cents",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = match self {
            Self::BTC => "BTC",
            Self::USDT => "USDT",
        };

        write!(f, "{sign}")
    }
}

impl FromStr for Currency {
    type Err = String;

    fn from_str(currency: &str) -> Result<Currency, Self::Err> {
        let currency = currency.to_lowercase();
        match &currency[..] {
            "btc" => Ok(Currency::BTC),
            "usdt" => Ok(Currency::USDT),
            _ => Err(format!("unknown currency {currency}")),
        }
    }
}

/// Kind of balance-affecting event recorded in the transaction log.
#[derive(Debug, PartialEq, Clone, Copy, Serialize, Deserialize, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TxType {
    Transfer,
    Deposit,
    Withdrawal,
}

impl TxType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxType::Transfer => "transfer",
            TxType::Deposit => "deposit",
            TxType::Withdrawal => "withdrawal",
        }
    }
}

impl fmt::Display for TxType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TxType {
    type Err = String;

    fn from_str(tx_type: &str) -> Result<TxType, Self::Err> {
        match tx_type {
            "transfer" => Ok(TxType::Transfer),
            "deposit" => Ok(TxType::Deposit),
            "withdrawal" => Ok(TxType::Withdrawal),
            _ => Err(format!("unknown transaction type {tx_type}")),
        }
    }
}

#[derive(Debug, PartialEq, Clone, Copy, Serialize, Deserialize, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DepositStatus {
    Pending,
    Confirmed,
    Failed,
}

impl DepositStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DepositStatus::Pending => "pending",
            DepositStatus::Confirmed => "confirmed",
            DepositStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, DepositStatus::Pending)
    }
}

impl fmt::Display for DepositStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DepositStatus {
    type Err = String;

    fn from_str(status: &str) -> Result<DepositStatus, Self::Err> {
        match status {
            "pending" => Ok(DepositStatus::Pending),
            "confirmed" => Ok(DepositStatus::Confirmed),
            "failed" => Ok(DepositStatus::Failed),
            _ => Err(format!("unknown deposit status {status}")),
        }
    }
}

/// Denominations a human may quote an amount in. `Sats` and `Btc` both
/// settle into the BTC balance.
#[derive(Debug, PartialEq, Clone, Copy, Serialize, Deserialize)]
pub enum Denom {
    Sats,
    Btc,
    Usdt,
}

impl Denom {
    pub fn currency(&self) -> Currency {
        match self {
            Denom::Sats | Denom::Btc => Currency::BTC,
            Denom::Usdt => Currency::USDT,
        }
    }

    fn scale(&self) -> Decimal {
        match self {
            Denom::Sats => Decimal::ONE,
            Denom::Btc => SATS_IN_BITCOIN,
            Denom::Usdt => CENTS_IN_DOLLAR,
        }
    }

    /// Converts a quoted value into minor units, dropping any fraction below
    /// the smallest unit. Returns `None` for values that don't fit an `i64`.
    pub fn to_minor_units(&self, value: Decimal) -> Option<i64> {
        let scaled = value.checked_mul(self.scale())?;
        scaled.round_dp_with_strategy(0, RoundingStrategy::ToZero).to_i64()
    }
}

impl FromStr for Denom {
    type Err = String;

    fn from_str(denom: &str) -> Result<Denom, Self::Err> {
        let denom = denom.to_lowercase();
        match &denom[..] {
            "sat" | "sats" => Ok(Denom::Sats),
            "btc" => Ok(Denom::Btc),
            "usdt" => Ok(Denom::Usdt),
            _ => Err(format!("unknown denomination {denom}")),
        }
    }
}

/// An integer amount of minor units tagged with its currency. Conversion to
/// the major unit only happens for display.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Money {
    amount: i64,
    currency: Currency,
}

impl Money {
    pub fn new(currency: Currency, amount: i64) -> Self {
        Self { amount, currency }
    }

    pub fn zero(currency: Currency) -> Self {
        Self::new(currency, 0)
    }

    pub fn amount(&self) -> i64 {
        self.amount
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    /// Value in the major unit (BTC, dollars).
    pub fn major(&self) -> Decimal {
        Decimal::new(self.amount, self.currency.dp())
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.currency {
            Currency::BTC => write!(f, "{} sats ({} BTC)", self.amount, self.major()),
            Currency::USDT => write!(f, "${} USDT", self.major()),
        }
    }
}
