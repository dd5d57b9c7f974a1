use crate::domain::cart::{CartLine, ViewedProduct};
use crate::domain::money::UnitPrice;
use crate::domain::payment::CardSubmission;
use crate::domain::session::ShippingRecord;
use crate::error::{CheckoutError, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;
use std::str::FromStr;

/// One row of a checkout script as it appears in the file.
#[derive(Debug, Deserialize)]
struct ScriptRow {
    event: String,
    a: Option<String>,
    b: Option<String>,
    c: Option<String>,
    d: Option<String>,
}

/// A storefront or checkout action read from a script.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptEvent {
    AddItem(CartLine),
    View(ViewedProduct),
    Shipping(ShippingRecord),
    Payment(CardSubmission),
    Code(String),
    Paste(String),
    Resend,
    Wait(u64),
    Back,
    EditShipping,
    EditPayment,
    Confirm,
}

impl ScriptEvent {
    /// Whether the event belongs to the checkout session rather than the
    /// storefront.
    pub fn is_checkout(&self) -> bool {
        !matches!(self, ScriptEvent::AddItem(_) | ScriptEvent::View(_))
    }
}

fn required(field: Option<String>, event: &str, name: &str) -> Result<String> {
    field
        .filter(|v| !v.is_empty())
        .ok_or_else(|| CheckoutError::Validation(format!("{event}: missing {name}")))
}

fn number<T: FromStr>(raw: &str, event: &str, name: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| CheckoutError::Validation(format!("{event}: invalid {name} '{raw}'")))
}

/// Splits a `left|right` column.
fn pair(raw: &str, event: &str, names: (&str, &str)) -> Result<(String, String)> {
    raw.split_once('|')
        .map(|(l, r)| (l.trim().to_string(), r.trim().to_string()))
        .ok_or_else(|| {
            CheckoutError::Validation(format!("{event}: expected {}|{}", names.0, names.1))
        })
}

impl TryFrom<ScriptRow> for ScriptEvent {
    type Error = CheckoutError;

    fn try_from(row: ScriptRow) -> Result<Self> {
        let ScriptRow { event, a, b, c, d } = row;
        let ev = event.as_str();
        let parsed = match ev {
            "item" => {
                let price: Decimal = number(&required(c, ev, "unit_price")?, ev, "unit_price")?;
                let (quantity, moq) = pair(&required(d, ev, "quantity|moq")?, ev, ("quantity", "moq"))?;
                ScriptEvent::AddItem(CartLine {
                    product_id: required(a, ev, "product_id")?,
                    name: required(b, ev, "name")?,
                    unit_price: UnitPrice::new(price)?,
                    quantity: number(&quantity, ev, "quantity")?,
                    moq: number(&moq, ev, "moq")?,
                })
            }
            "view" => ScriptEvent::View(ViewedProduct {
                product_id: required(a, ev, "product_id")?,
                name: required(b, ev, "name")?,
            }),
            "shipping" => {
                // Blank fields are left to the shipping validator.
                let (postal_code, country) = pair(
                    d.as_deref().unwrap_or_default(),
                    ev,
                    ("postal_code", "country"),
                )?;
                ScriptEvent::Shipping(ShippingRecord {
                    full_name: a.unwrap_or_default(),
                    street: b.unwrap_or_default(),
                    city: c.unwrap_or_default(),
                    postal_code,
                    country,
                })
            }
            "payment" => ScriptEvent::Payment(CardSubmission {
                holder_name: a.unwrap_or_default(),
                number: b.unwrap_or_default(),
                expiry_month: number(&required(c, ev, "month")?, ev, "month")?,
                expiry_year: number(&required(d, ev, "year")?, ev, "year")?,
            }),
            // An empty candidate is still submitted and rejected by shape.
            "code" => ScriptEvent::Code(a.unwrap_or_default()),
            "paste" => ScriptEvent::Paste(a.unwrap_or_default()),
            "resend" => ScriptEvent::Resend,
            "wait" => ScriptEvent::Wait(number(&required(a, ev, "seconds")?, ev, "seconds")?),
            "back" => ScriptEvent::Back,
            "edit_shipping" => ScriptEvent::EditShipping,
            "edit_payment" => ScriptEvent::EditPayment,
            "confirm" => ScriptEvent::Confirm,
            other => {
                return Err(CheckoutError::Validation(format!(
                    "Unknown event '{other}'"
                )));
            }
        };
        Ok(parsed)
    }
}

/// Reads checkout events from a CSV source with header `event,a,b,c,d`.
///
/// Whitespace is trimmed and rows may omit trailing columns.
pub struct ScriptReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> ScriptReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily reads and parses events. A malformed row yields an error and
    /// reading continues with the next row.
    pub fn events(self) -> impl Iterator<Item = Result<ScriptEvent>> {
        self.reader
            .into_deserialize::<ScriptRow>()
            .map(|row| row.map_err(CheckoutError::from).and_then(ScriptEvent::try_from))
    }
}
