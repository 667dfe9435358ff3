// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Signature help
//!
//! Resolves the function call around the cursor into signature help,
//! reading only the schema cache. The backward iterator counts the
//! argument position inside the nearest unmatched `(`, then reads the
//! preceding identifier as the function name. Quoted identifiers never
//! name functions here, so a quoted match produces no signatures rather
//! than a wrong one.

use std::sync::Arc;

use tower_lsp::lsp_types::{
    Documentation, ParameterInformation, ParameterLabel, Position, SignatureHelp,
    SignatureInformation,
};

use postgres_sql_lsp_catalog::SchemaCache;
use postgres_sql_lsp_text::BackwardIterator;

use crate::document::Document;

/// Compute signature help at a cursor position.
///
/// Overloads with fewer arguments than the current parameter index are
/// filtered out; the first remaining overload is reported active with
/// the parameter index clamped to its arity. No match means no active
/// signature — that is an empty response, not an error.
pub fn signature_help(
    cache: &Arc<SchemaCache>,
    document: &Document,
    position: Position,
) -> Option<SignatureHelp> {
    let text = document.get_content();
    let mut iter = BackwardIterator::new(&text, position.line, position.character);

    let param_index = iter.read_arguments();
    if param_index < 0 {
        return None;
    }
    let param_index = param_index as usize;

    let ident = iter.read_ident();
    if ident.is_empty() || ident.quoted {
        return None;
    }
    let name = ident.text.to_lowercase();

    let mut signatures = Vec::new();
    for function in cache.functions_named(&name) {
        for overload in &function.overloads {
            if overload.args.len() < param_index {
                continue;
            }
            signatures.push(SignatureInformation {
                label: format!("{}({})", function.name, overload.args.join(", ")),
                documentation: overload.description.clone().map(Documentation::String),
                parameters: Some(
                    overload
                        .args
                        .iter()
                        .map(|arg| ParameterInformation {
                            label: ParameterLabel::Simple(arg.clone()),
                            documentation: None,
                        })
                        .collect(),
                ),
                active_parameter: None,
            });
        }
    }

    if signatures.is_empty() {
        return None;
    }

    let first_arity = signatures[0]
        .parameters
        .as_ref()
        .map(|p| p.len())
        .unwrap_or(0);
    let active_parameter = param_index.min(first_arity.saturating_sub(1)) as u32;

    Some(SignatureHelp {
        signatures,
        active_signature: Some(0),
        active_parameter: Some(active_parameter),
    })
}
