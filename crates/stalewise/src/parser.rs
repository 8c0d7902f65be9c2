//! Header element parser using nom
//!
//! Element list format:
//! ```text
//! element *( "," element )
//! element = token [ "=" value ] *( ";" token [ "=" value ] )
//! value   = quoted-string | <anything up to "," or ";">
//! ```
//!
//! Examples: `private, max-age=39`, `text/html; q=0.9, */*; q=0.1`,
//! `W/"abc"`.

use nom::{
    branch::alt,
    bytes::complete::{is_not, take_while1},
    character::complete::{char, multispace0},
    combinator::{map, opt, recognize},
    multi::{many0, separated_list0},
    sequence::{delimited, pair, preceded, tuple},
    IResult,
};

use crate::directive::{Directive, Parameter};

fn is_token_char(c: char) -> bool {
    !c.is_whitespace() && !matches!(c, ',' | ';' | '=' | '"')
}

fn token(input: &str) -> IResult<&str, &str> {
    take_while1(is_token_char)(input)
}

/// Quoted string, returned with its quotes; `Directive::new` strips them
fn quoted(input: &str) -> IResult<&str, &str> {
    recognize(delimited(char('"'), opt(is_not("\"")), char('"')))(input)
}

fn bare(input: &str) -> IResult<&str, &str> {
    map(is_not(",;"), str::trim)(input)
}

fn value(input: &str) -> IResult<&str, &str> {
    preceded(
        tuple((multispace0, char('='), multispace0)),
        map(opt(alt((quoted, bare))), Option::unwrap_or_default),
    )(input)
}

fn parameter(input: &str) -> IResult<&str, Parameter> {
    map(
        preceded(tuple((multispace0, char(';'), multispace0)), pair(token, opt(value))),
        |(name, value)| Parameter::new(name, value.unwrap_or_default()),
    )(input)
}

fn element(input: &str) -> IResult<&str, Directive> {
    map(
        delimited(
            multispace0,
            tuple((token, opt(value), many0(parameter))),
            multispace0,
        ),
        |(name, value, parameters)| {
            Directive::with_parameters(name, value.unwrap_or_default(), parameters)
        },
    )(input)
}

fn elements(input: &str) -> IResult<&str, Vec<Option<Directive>>> {
    separated_list0(
        delimited(multispace0, char(','), multispace0),
        opt(element),
    )(input)
}

/// Parse a header value into its comma-separated directives
///
/// Empty elements are skipped. Input the grammar cannot follow ends the list;
/// whatever parsed before it is returned.
pub fn parse_elements(input: &str) -> Vec<Directive> {
    match elements(input) {
        Ok((rest, parsed)) => {
            if !rest.trim().is_empty() {
                tracing::debug!(header = input, rest, "ignoring unparseable header element tail");
            }
            parsed.into_iter().flatten().collect()
        }
        Err(e) => {
            tracing::debug!(header = input, error = ?e, "unparseable header value");
            Vec::new()
        }
    }
}
