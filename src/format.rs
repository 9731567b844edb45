use crate::quote::{Quote, symbol_for};

/// Render a quote as the reply text, e.g. `1 BTC = US$20000.50`.
pub fn format_quote(quote: &Quote) -> String {
    let glyph = symbol_for(&quote.second);

    let mut out = if quote.has_custom_amount() {
        format!(
            "{} {} = {}{}",
            format_amount(quote.amount),
            quote.first,
            glyph,
            format_price(quote.total())
        )
    } else {
        format!("1 {} = {}{}", quote.first, glyph, format_price(quote.unit_price))
    };

    if let Some(source) = &quote.source {
        out.push_str("\nSource: ");
        out.push_str(source);
    }

    out
}

/// Prices below one get 8 fractional digits, everything else 2.
pub fn format_price(value: f64) -> String {
    if value < 1.0 {
        format!("{:.8}", value)
    } else {
        format!("{:.2}", value)
    }
}

/// Amounts: 8 digits below one, none for whole numbers, 2 otherwise.
pub fn format_amount(value: f64) -> String {
    if value < 1.0 {
        format!("{:.8}", value)
    } else if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{:.2}", value)
    }
}
