use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "attrmap",
    about = "attrmap: inspect attribute encodings, blob keys and compiled queries",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Mapper configuration file (TOML)
    #[arg(long, global = true)]
    pub config: Option<String>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Encode a typed value as a sortable attribute string
    Encode(EncodeArgs),
    /// Decode an attribute string back into a typed value
    Decode(DecodeArgs),
    /// Show the object key a blob field is stored under
    ObjectKey(ObjectKeyArgs),
    /// Compile a query expression into a select statement
    Query(QueryArgs),
    /// Print the effective mapper configuration
    Config,
}

#[derive(Args)]
pub struct EncodeArgs {
    /// text, int32, int64, float32, timestamp or boolean
    pub r#type: String,
    pub value: String,
    /// Encode as an item key
    #[arg(long)]
    pub key: bool,
}

#[derive(Args)]
pub struct DecodeArgs {
    pub r#type: String,
    pub encoded: String,
    /// Decode as an item key
    #[arg(long)]
    pub key: bool,
}

#[derive(Args)]
pub struct ObjectKeyArgs {
    pub prefix: String,
    /// The encoded record key
    pub key: String,
    pub attribute: String,
}

#[derive(Args)]
pub struct QueryArgs {
    pub domain: String,
    /// `attribute operator [type:]value`; conditions after the first start
    /// with `and`, `or` or `intersection`
    #[arg(short = 'c', long = "condition")]
    pub conditions: Vec<String>,
    #[arg(long)]
    pub order_by: Option<String>,
    #[arg(long)]
    pub desc: bool,
    #[arg(short = 'n', long, default_value = "0")]
    pub limit: u32,
    /// Compile a count instead of a select
    #[arg(long)]
    pub count: bool,
}
