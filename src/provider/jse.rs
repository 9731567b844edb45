use async_trait::async_trait;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, trace};

use super::{ListingProvider, ListingRow, parse_price_text};
use crate::config::{DEFAULT_JSE_URL, http_client};
use crate::error::{Error, Result};

const ROW_SELECTOR: &str = "tr";
const CELL_SELECTOR: &str = "td";
const SYMBOL_CELL: usize = 0;
const PRICE_CELL: usize = 2;

/// Jamaica Stock Exchange -- trade quotes scraped from the public listing page.
pub struct Jse {
    client: Client,
    url: String,
}

impl Jse {
    pub fn new() -> Self {
        Self::with_url(DEFAULT_JSE_URL)
    }

    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            client: http_client(),
            url: url.into(),
        }
    }
}

impl Default for Jse {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ListingProvider for Jse {
    fn name(&self) -> &str {
        "Jamaica Stock Exchange"
    }

    fn id(&self) -> &str {
        "jse"
    }

    fn currency(&self) -> &str {
        "JMD"
    }

    async fn scrape(&self) -> Result<Vec<ListingRow>> {
        debug!(url = %self.url, "scraping JSE listing page");

        let resp = self.client.get(&self.url).send().await?;
        let status = resp.status();
        let body = resp.text().await?;

        debug!(status = %status, body_len = body.len(), "JSE response");
        trace!(body = %body, "JSE response body");

        if !status.is_success() {
            return Err(Error::Api(format!("JSE returned {}", status)));
        }

        let rows = parse_listing(&body)?;
        if rows.is_empty() {
            return Err(Error::Api("JSE listing page contained no quotes".into()));
        }

        debug!(rows = rows.len(), "parsed JSE listing");
        Ok(rows)
    }
}

/// Extract every `<tr>` with a symbol and a price cell. Rows that don't fit are skipped.
pub fn parse_listing(html: &str) -> Result<Vec<ListingRow>> {
    let row_selector = selector(ROW_SELECTOR)?;
    let cell_selector = selector(CELL_SELECTOR)?;
    let document = Html::parse_document(html);

    let rows = document
        .select(&row_selector)
        .filter_map(|row| {
            let parsed = parse_row(row, &cell_selector);
            if parsed.is_none() {
                trace!(row = %cell_text(row), "skipping listing row");
            }
            parsed
        })
        .collect();

    Ok(rows)
}

fn parse_row(row: ElementRef<'_>, cell_selector: &Selector) -> Option<ListingRow> {
    let cells: Vec<ElementRef<'_>> = row.select(cell_selector).collect();
    let symbol = cell_text(*cells.get(SYMBOL_CELL)?).to_uppercase();
    if symbol.is_empty() || symbol.contains(char::is_whitespace) {
        return None;
    }
    let price = parse_price_text(&cell_text(*cells.get(PRICE_CELL)?))?;
    Some(ListingRow { symbol, price })
}

fn cell_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| Error::Parse(format!("invalid selector '{}': {:?}", css, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
        <table>
          <thead><tr><th>Symbol</th><th>Volume</th><th>Closing Price ($)</th></tr></thead>
          <tbody>
            <tr><td><a href="/ncbfg">NCBFG</a></td><td>10,200</td><td>$112.50</td></tr>
            <tr><td>GK</td><td>3,000</td><td>$1,075.00</td></tr>
            <tr><td>BROKEN</td><td>1</td><td>suspended</td></tr>
            <tr><td>SHORT</td></tr>
          </tbody>
        </table>
        </body></html>
    "#;

    #[test]
    fn parses_well_formed_rows() {
        let rows = parse_listing(PAGE).unwrap();
        assert_eq!(
            rows,
            vec![
                ListingRow { symbol: "NCBFG".into(), price: 112.5 },
                ListingRow { symbol: "GK".into(), price: 1075.0 },
            ]
        );
    }

    #[test]
    fn page_without_table_yields_nothing() {
        let rows = parse_listing("<html><body><p>maintenance</p></body></html>").unwrap();
        assert!(rows.is_empty());
    }
}
