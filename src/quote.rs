/// Amount used when the user asks for a plain quote.
pub const DEFAULT_AMOUNT: f64 = 1.0;

/// A resolved price: `1 first = unit_price second`, scaled by `amount`.
#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub first: String,
    pub second: String,
    pub unit_price: f64,
    pub amount: f64,
    pub source: Option<String>,
}

impl Quote {
    pub fn new(first: &str, second: &str, unit_price: f64) -> Self {
        Self {
            first: first.to_uppercase(),
            second: second.to_uppercase(),
            unit_price,
            amount: DEFAULT_AMOUNT,
            source: None,
        }
    }

    pub fn with_amount(mut self, amount: f64) -> Self {
        self.amount = amount;
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Total cost of `amount` units of `first`, in `second`.
    pub fn total(&self) -> f64 {
        self.unit_price * self.amount
    }

    pub fn has_custom_amount(&self) -> bool {
        self.amount != DEFAULT_AMOUNT
    }
}

/// Fiat currencies natively quoted by the fiat/crypto price service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fiat {
    Usd,
    Eur,
}

impl Fiat {
    pub const ALL: [Fiat; 2] = [Fiat::Usd, Fiat::Eur];

    /// Look up a ticker in the fiat set (case-insensitive).
    pub fn from_ticker(ticker: &str) -> Option<Self> {
        match ticker.to_uppercase().as_str() {
            "USD" => Some(Self::Usd),
            "EUR" => Some(Self::Eur),
            _ => None,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Self::Usd => "USD",
            Self::Eur => "EUR",
        }
    }

    /// Name of the upstream field carrying a price in this currency.
    pub fn price_field(self) -> &'static str {
        match self {
            Self::Usd => "price_usd",
            Self::Eur => "price_eur",
        }
    }
}

/// Returns `true` when `ticker` belongs to the fiat set.
pub fn is_fiat(ticker: &str) -> bool {
    Fiat::from_ticker(ticker).is_some()
}

/// Display glyph for a ticker. Falls back to the ticker itself.
pub fn symbol_for(ticker: &str) -> &str {
    match ticker {
        "USD" => "US$",
        "EUR" => "€",
        "BTC" => "฿",
        "ETH" => "Ξ",
        "LTC" => "Ł",
        "JMD" => "J$",
        _ => ticker,
    }
}
