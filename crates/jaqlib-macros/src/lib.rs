//! Proc macros for jaqlib.
//!
//! # Available Macros
//!
//! - [`Recordable`] - Generate a recording stand-in and replay support for
//!   a struct, so its fields can be used in query conditions

mod recordable;

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

/// Derives `Recordable` (and `Invocable`) for a struct with named fields.
///
/// For `struct Person` the macro generates `PersonRecorder`. Each recorded
/// field becomes a recorder method that logs the call and returns a default
/// value; replaying the call on a real `Person` yields the field's value.
///
/// # Field Attributes
///
/// | Attribute | Description |
/// |-----------|-------------|
/// | *(none)* | Replay as `Value::from(field.clone())`; the recorder method returns the field type |
/// | `Timestamp` | Replay through `TimestampField`; the recorder method returns `Timestamp` |
/// | `Enum` | Replay through `EnumField`; the recorder method returns the `u32` discriminant |
/// | `skip` | No recorder method for this field |
/// | `rename = "..."` | Record and replay under a different method name |
/// | `ty = "..."` | Field kind as a string (`"enum"`, `"timestamp"`) |
///
/// Recorded field types must implement `Default` and, without a kind
/// attribute, `Clone` and `Into<Value>`.
///
/// # Example
///
/// ```ignore
/// use jaqlib::{EnumField, Query, Recordable};
///
/// #[derive(Clone, Copy, Default)]
/// enum Status { #[default] Open, Closed }
///
/// impl EnumField for Status {
///     fn discriminant(&self) -> u32 { *self as u32 }
/// }
///
/// #[derive(Clone, Recordable)]
/// struct Ticket {
///     title: String,
///     #[record(Enum)]
///     status: Status,
///     #[record(Timestamp, rename = "opened")]
///     opened_at: i64,
///     #[record(skip)]
///     attachments: Vec<Vec<u8>>,
/// }
///
/// let rec = Ticket::recorder();
/// let open = Query::from_items(tickets.iter())
///     .recorded_by(&rec)
///     .where_(rec.status())?
///     .is_equal(Status::Open.discriminant())
///     .as_list()?;
/// ```
///
/// # Compile-Time Errors
///
/// - Enums, unions, tuple structs and unit structs
/// - Generic structs
/// - Two fields recorded under the same name
/// - Unknown `#[record(...)]` attributes
#[proc_macro_derive(Recordable, attributes(record))]
pub fn recordable_derive(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    recordable::recordable_derive_impl(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
