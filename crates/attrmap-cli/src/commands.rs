use anyhow::{anyhow, bail, Context};
use attrmap_blob::derive_object_key;
use attrmap_mapper::MapperConfig;
use attrmap_query::{
    BooleanOperator, ComparisonOperator, Condition, Direction, QueryCompiler, QueryExpression,
};
use attrmap_types::{ScalarCodec, ScalarType, ScalarValue, TIMESTAMP_FORMAT};
use chrono::DateTime;
use colored::Colorize;
use tracing::debug;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_deref())?;
    let codec = ScalarCodec::new(config.number_digits);
    match cli.command {
        Command::Encode(args) => cmd_encode(&codec, args),
        Command::Decode(args) => cmd_decode(&codec, args),
        Command::ObjectKey(args) => {
            println!("{}", derive_object_key(&args.prefix, &args.key, &args.attribute));
            Ok(())
        }
        Command::Query(args) => cmd_query(codec, args),
        Command::Config => {
            print!("{}", config.to_toml_string()?);
            Ok(())
        }
    }
}

fn load_config(path: Option<&str>) -> anyhow::Result<MapperConfig> {
    let Some(path) = path else {
        return Ok(MapperConfig::default());
    };
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
    let config = MapperConfig::from_toml_str(&text)?;
    debug!(path, ?config, "loaded configuration");
    Ok(config)
}

fn cmd_encode(codec: &ScalarCodec, args: EncodeArgs) -> anyhow::Result<()> {
    let ty = parse_type(&args.r#type)?;
    let value = parse_literal(ty, &args.value)?;
    let encoded = if args.key {
        codec.encode_key(&value)?
    } else {
        codec.encode(&value)?
    };
    println!("{}", encoded.green());
    Ok(())
}

fn cmd_decode(codec: &ScalarCodec, args: DecodeArgs) -> anyhow::Result<()> {
    let ty = parse_type(&args.r#type)?;
    let value = if args.key {
        codec.decode_key(ty, &args.encoded)?
    } else {
        codec.decode(ty, &args.encoded)?
    };
    println!("{} {}", value.to_string().green(), format!("({ty})").dimmed());
    Ok(())
}

fn cmd_query(codec: ScalarCodec, args: QueryArgs) -> anyhow::Result<()> {
    let compiler = QueryCompiler::new(codec);
    let expression = build_expression(&args)?;
    let query = if args.count {
        compiler.compile_count(&args.domain, expression.as_ref())?
    } else {
        compiler.compile_select(&args.domain, expression.as_ref())?
    };
    println!("{query}");
    Ok(())
}

fn build_expression(args: &QueryArgs) -> anyhow::Result<Option<QueryExpression>> {
    let mut conditions = args.conditions.iter();
    let Some(first) = conditions.next() else {
        if args.order_by.is_some() {
            bail!("--order-by needs at least one condition");
        }
        return Ok(None);
    };

    let (op, condition) = parse_condition(first)?;
    if let Some(op) = op {
        bail!("the first condition cannot start with {}", op.as_str());
    }
    let mut expr = QueryExpression::where_(condition);
    for text in conditions {
        let (op, condition) = parse_condition(text)?;
        let op = op.ok_or_else(|| anyhow!("condition {text:?} must start with and, or or intersection"))?;
        expr = expr.chain(op, condition);
    }
    if let Some(attribute) = &args.order_by {
        let direction = if args.desc { Direction::Desc } else { Direction::Asc };
        expr = expr.order_by(attribute.clone(), direction);
    }
    Ok(Some(expr.limit(args.limit)))
}

fn parse_type(name: &str) -> anyhow::Result<ScalarType> {
    name.parse::<ScalarType>().map_err(anyhow::Error::msg)
}

/// Parse `text` as a value of `ty`. Timestamps accept RFC 3339 or the stored form.
fn parse_literal(ty: ScalarType, text: &str) -> anyhow::Result<ScalarValue> {
    let value = match ty {
        ScalarType::Text => ScalarValue::Text(text.to_string()),
        ScalarType::Int32 => ScalarValue::Int32(text.parse().with_context(|| format!("{text:?} is not an int32"))?),
        ScalarType::Int64 => ScalarValue::Int64(text.parse().with_context(|| format!("{text:?} is not an int64"))?),
        ScalarType::Float32 => {
            ScalarValue::Float32(text.parse().with_context(|| format!("{text:?} is not a float32"))?)
        }
        ScalarType::Boolean => {
            ScalarValue::Boolean(text.parse().with_context(|| format!("{text:?} is not a boolean"))?)
        }
        ScalarType::Timestamp => {
            let parsed = DateTime::parse_from_rfc3339(text)
                .or_else(|_| DateTime::parse_from_str(text, TIMESTAMP_FORMAT))
                .with_context(|| format!("{text:?} is not a timestamp"))?;
            ScalarValue::Timestamp(parsed)
        }
    };
    Ok(value)
}

/// Parse `[and|or|intersection] attribute operator [[type:]value]`.
///
/// An untyped value is text.
fn parse_condition(text: &str) -> anyhow::Result<(Option<BooleanOperator>, Condition)> {
    let mut words: Vec<&str> = text.split_whitespace().collect();
    let joiner = match words.first().map(|w| w.parse::<BooleanOperator>()) {
        Some(Ok(op)) => {
            words.remove(0);
            Some(op)
        }
        _ => None,
    };
    let (attribute, rest) = words
        .split_first()
        .ok_or_else(|| anyhow!("empty condition {text:?}"))?;

    // longest operator first: "is not null" before "is"
    let (operator, used) = (1..=rest.len().min(3))
        .rev()
        .find_map(|n| {
            rest[..n]
                .join(" ")
                .parse::<ComparisonOperator>()
                .ok()
                .map(|op| (op, n))
        })
        .ok_or_else(|| anyhow!("no comparison operator in {text:?}"))?;

    let raw = rest[used..].join(" ");
    let value = if raw.is_empty() {
        None
    } else {
        let (ty, literal) = match raw.split_once(':') {
            Some((prefix, literal)) => match prefix.parse::<ScalarType>() {
                Ok(ty) => (ty, literal),
                Err(_) => (ScalarType::Text, raw.as_str()),
            },
            None => (ScalarType::Text, raw.as_str()),
        };
        Some(parse_literal(ty, literal)?)
    };
    Ok((joiner, Condition::new(*attribute, operator, value)))
}
