use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::error::Error;
use crate::format::format_quote;
use crate::resolver::Resolver;
use crate::router::{Command, Handler, RouteError, Router, Venue};

pub const WELCOME_MESSAGE: &str = "Ask me for prices with /quote (ticker). Example: /quote BTC";

pub const HELP_MESSAGE: &str = "Usage:\n\
    /quote <ticker> [currency] - e.g. /quote BTC or /quote BTC EUR\n\
    /convert <amount> <from> <to> - e.g. /convert 100 USD BTC\n\
    /cex <ticker> - CEX.IO price in USD\n\
    /jse <ticker> - Jamaica Stock Exchange price\n\
    /source - where prices come from\n\
    You can also just send a ticker, like BTC.";

/// Stateless request handler: routes text, resolves quotes, builds the reply.
pub struct Bot {
    router: Router,
    resolver: Resolver,
    default_currency: String,
}

impl Bot {
    pub fn new(router: Router, resolver: Resolver, default_currency: &str) -> Self {
        Self {
            router,
            resolver,
            default_currency: default_currency.to_uppercase(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            Router::new(settings.implicit_max_tokens),
            Resolver::from_settings(settings),
            &settings.default_currency,
        )
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    /// Reply text for one inbound message, or `None` when it should be ignored.
    pub async fn handle(&self, text: &str, is_command: bool) -> Option<String> {
        match self.router.route(text, is_command) {
            Ok(command) => {
                debug!(handler = %command.handler, arguments = ?command.arguments, "routed message");
                Some(self.dispatch(command).await)
            }
            Err(RouteError::UnknownCommand(name)) => {
                debug!(command = %name, "unknown command, answering with help");
                Some(HELP_MESSAGE.to_string())
            }
            Err(err) => {
                debug!(error = %err, "dropping message");
                None
            }
        }
    }

    async fn dispatch(&self, command: Command) -> String {
        let args = command.arguments;
        match command.handler {
            Handler::Start => WELCOME_MESSAGE.to_string(),
            Handler::Help => HELP_MESSAGE.to_string(),
            Handler::Source => self.source_message(),
            Handler::Quote => self.quote(&args).await,
            Handler::Convert => self.convert(&args).await,
            Handler::Exchange(venue) => self.exchange_quote(venue, &args).await,
        }
    }

    fn source_message(&self) -> String {
        let [fiat, pairs, exchange, listing] = self.resolver.source_names();
        format!(
            "Fiat prices come from {}, crypto pairs from {}, /cex from {} and /jse from the {} listing.",
            fiat, pairs, exchange, listing
        )
    }

    async fn quote(&self, args: &[String]) -> String {
        let (ticker, currency) = match args {
            [ticker] => (ticker.to_uppercase(), self.default_currency.clone()),
            [ticker, currency] => (ticker.to_uppercase(), currency.to_uppercase()),
            _ => return HELP_MESSAGE.to_string(),
        };

        info!(ticker = %ticker, currency = %currency, "quote request");
        match self.resolver.resolve(&ticker, &currency, 1.0).await {
            Ok(quote) => format_quote(&quote),
            Err(err) => error_reply(&err, &ticker),
        }
    }

    async fn convert(&self, args: &[String]) -> String {
        let [amount, from, to] = args else {
            return HELP_MESSAGE.to_string();
        };
        let amount = match parse_amount(amount) {
            Some(amount) => amount,
            None => return HELP_MESSAGE.to_string(),
        };
        let from = from.to_uppercase();
        let to = to.to_uppercase();

        info!(amount, from = %from, to = %to, "convert request");
        match self.resolver.resolve(&from, &to, amount).await {
            Ok(quote) => format_quote(&quote),
            Err(err) => error_reply(&err, &format!("{}/{}", from, to)),
        }
    }

    async fn exchange_quote(&self, venue: Venue, args: &[String]) -> String {
        let [ticker] = args else {
            return HELP_MESSAGE.to_string();
        };
        let ticker = ticker.to_uppercase();

        info!(venue = venue.command(), ticker = %ticker, "exchange quote request");
        match self.resolver.resolve_on(venue, &ticker).await {
            Ok(quote) => format_quote(&quote),
            Err(err) => error_reply(&err, &ticker),
        }
    }
}

fn parse_amount(raw: &str) -> Option<f64> {
    let amount: f64 = raw.replace(',', "").parse().ok()?;
    (amount.is_finite() && amount > 0.0).then_some(amount)
}

/// User-facing text for a failed lookup of `subject`.
fn error_reply(err: &Error, subject: &str) -> String {
    match err {
        Error::Http(_) | Error::Api(_) => {
            warn!(subject, error = %err, "upstream unavailable");
            format!("Error retrieving {} price, please try again later", subject)
        }
        Error::Parse(_) => {
            warn!(subject, error = %err, "could not decode upstream response");
            format!("Error decoding response for {}", subject)
        }
        Error::NotFound(symbol) => format!("{} was not found", symbol),
        Error::NotQuotable { pair, message } => {
            format!("{} is not available: {}", pair.to_uppercase(), message)
        }
        Error::Input(_) | Error::Config(_) | Error::Io(_) => {
            debug!(subject, error = %err, "request failed");
            HELP_MESSAGE.to_string()
        }
    }
}
