//! Attribute parsing for the Recordable derive macro.
//!
//! This module parses the `#[record(...)]` field attributes used by the
//! `Recordable` derive macro.

use proc_macro2::Span;
use syn::{
    parse::{Parse, ParseStream},
    punctuated::Punctuated,
    spanned::Spanned,
    Attribute, Error, Ident, Lit, Meta, Result, Token,
};

/// How a field's value is captured when a recorded call is replayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldKind {
    /// `Value::from(field.clone())`; the recorder returns the field type.
    #[default]
    Value,
    /// `#[record(Timestamp)]`: converted through `TimestampField`; the
    /// recorder returns `Timestamp`.
    Timestamp,
    /// `#[record(Enum)]`: converted through `EnumField`; the recorder
    /// returns the `u32` discriminant.
    Enum,
}

impl FieldKind {
    fn parse(name: &str, span: Span) -> Result<Self> {
        match name {
            "Value" | "value" => Ok(FieldKind::Value),
            "Timestamp" | "timestamp" => Ok(FieldKind::Timestamp),
            "Enum" | "enum" | "enumeration" => Ok(FieldKind::Enum),
            other => Err(Error::new(
                span,
                format!(
                    "unknown field kind: '{}'. Expected one of: Value, Timestamp, Enum",
                    other
                ),
            )),
        }
    }

    /// Parse a field kind from an identifier.
    pub fn from_ident(ident: &Ident) -> Result<Self> {
        FieldKind::parse(&ident.to_string(), ident.span())
    }
}

/// Field-level attributes from `#[record(...)]`.
#[derive(Debug, Clone)]
pub struct RecordAttr {
    /// How the field is replayed.
    pub kind: FieldKind,
    /// Leave this field out of the recorder.
    pub skip: bool,
    /// Method name to record and replay (default: field name).
    pub rename: Option<String>,
    /// The span for error reporting.
    pub span: Span,
}

impl Default for RecordAttr {
    fn default() -> Self {
        RecordAttr {
            kind: FieldKind::Value,
            skip: false,
            rename: None,
            span: Span::call_site(),
        }
    }
}

fn string_literal(value: &syn::Expr, what: &str) -> Result<syn::LitStr> {
    match value {
        syn::Expr::Lit(syn::ExprLit {
            lit: Lit::Str(s), ..
        }) => Ok(s.clone()),
        other => Err(Error::new(
            other.span(),
            format!("{} must be a string literal", what),
        )),
    }
}

impl Parse for RecordAttr {
    fn parse(input: ParseStream) -> Result<Self> {
        let mut attr = RecordAttr::default();

        let content: Punctuated<Meta, Token![,]> = Punctuated::parse_terminated(input)?;

        for meta in content {
            match &meta {
                // record(skip), record(Timestamp), record(Enum)
                Meta::Path(p) => {
                    if p.is_ident("skip") {
                        attr.skip = true;
                    } else if let Some(ident) = p.get_ident() {
                        attr.kind = FieldKind::from_ident(ident)?;
                        attr.span = ident.span();
                    } else {
                        return Err(Error::new(
                            p.span(),
                            "expected field kind: Value, Timestamp, Enum, or skip",
                        ));
                    }
                }

                // rename = "method" or ty = "enum"
                Meta::NameValue(nv) => {
                    if nv.path.is_ident("rename") {
                        let s = string_literal(&nv.value, "rename")?;
                        if s.value().is_empty() {
                            return Err(Error::new(s.span(), "rename must not be empty"));
                        }
                        attr.rename = Some(s.value());
                    } else if nv.path.is_ident("ty") {
                        let s = string_literal(&nv.value, "ty")?;
                        attr.kind = FieldKind::parse(&s.value(), s.span())?;
                        attr.span = s.span();
                    } else {
                        return Err(Error::new(
                            nv.path.span(),
                            "unknown attribute. Expected: rename or ty",
                        ));
                    }
                }

                _ => {
                    return Err(Error::new(
                        meta.span(),
                        "unknown record attribute. Expected: Value, Timestamp, Enum, skip, rename = \"...\", or ty = \"...\"",
                    ));
                }
            }
        }

        if attr.skip && (attr.rename.is_some() || attr.kind != FieldKind::Value) {
            return Err(Error::new(
                attr.span,
                "skip cannot be combined with other record attributes",
            ));
        }

        Ok(attr)
    }
}

/// Extract `#[record(...)]` attributes from a field's attributes.
pub fn parse_record_attrs(attrs: &[Attribute]) -> Result<RecordAttr> {
    for attr in attrs {
        if attr.path().is_ident("record") {
            return attr.parse_args::<RecordAttr>();
        }
    }
    Ok(RecordAttr::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_record(tokens: &str) -> Result<RecordAttr> {
        syn::parse_str::<RecordAttr>(tokens)
    }

    #[test]
    fn test_default_is_value() {
        let attr = parse_record("").unwrap();
        assert_eq!(attr.kind, FieldKind::Value);
        assert!(!attr.skip);
        assert_eq!(attr.rename, None);
    }

    #[test]
    fn test_record_timestamp() {
        let attr = parse_record("Timestamp").unwrap();
        assert_eq!(attr.kind, FieldKind::Timestamp);
    }

    #[test]
    fn test_record_enum() {
        let attr = parse_record("Enum").unwrap();
        assert_eq!(attr.kind, FieldKind::Enum);
    }

    #[test]
    fn test_record_enum_via_ty() {
        // lowercase `enum` is a keyword, so it goes through ty = "..."
        let attr = parse_record(r#"ty = "enum""#).unwrap();
        assert_eq!(attr.kind, FieldKind::Enum);
    }

    #[test]
    fn test_record_skip() {
        let attr = parse_record("skip").unwrap();
        assert!(attr.skip);
    }

    #[test]
    fn test_record_rename() {
        let attr = parse_record(r#"Timestamp, rename = "created""#).unwrap();
        assert_eq!(attr.kind, FieldKind::Timestamp);
        assert_eq!(attr.rename, Some("created".to_string()));
    }

    #[test]
    fn test_record_empty_rename() {
        let result = parse_record(r#"rename = """#);
        assert!(result.unwrap_err().to_string().contains("must not be empty"));
    }

    #[test]
    fn test_record_invalid_kind() {
        let result = parse_record("Number");
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("unknown field kind"));
    }

    #[test]
    fn test_record_unknown_name_value() {
        let result = parse_record(r#"alias = "x""#);
        assert!(result.is_err());
    }

    #[test]
    fn test_record_skip_with_rename() {
        let result = parse_record(r#"skip, rename = "x""#);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_from_field_attributes() {
        let field: syn::Field = syn::parse_quote! {
            #[serde(default)]
            #[record(rename = "when")]
            created_at: i64
        };
        let attr = parse_record_attrs(&field.attrs).unwrap();
        assert_eq!(attr.rename, Some("when".to_string()));
    }
}
