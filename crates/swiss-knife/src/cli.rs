use std::path::PathBuf;

use alloy::json_abi::{Constructor, Function, JsonAbi, StateMutability};
use alloy::primitives::{hex, Address};
use clap::{Parser, Subcommand};
use eyre::{bail, Result, WrapErr};
use serde_json::Value;
use tracing::info;

use swiss_knife_calldata_adapters::{http_resolver, CalldataAdapterConfig, SourcifyAbiSource};
use swiss_knife_calldata_core::{
    convert_booleans_for_inputs, encode_constructor, encode_function_call, encode_packed,
    encode_parameters, selector_for, CalldataDecoder, FunctionSource, NoopLookup,
    SelectorResolver, SignatureLookupPort,
};

/// Recursive calldata decoder and ABI encoder
#[derive(Parser, Debug)]
#[command(name = "swiss-knife", version, about, long_about = None)]
pub struct Cli {
    /// Never call signature databases or ABI sources
    #[arg(long, global = true)]
    pub offline: bool,

    /// HTTP timeout for lookups, overrides SWISS_KNIFE_HTTP_TIMEOUT_MS
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Decode calldata into a call tree, printed as JSON
    Decode {
        calldata: String,
        /// Decode against this signature instead of resolving the selector
        #[arg(long, conflicts_with_all = ["abi", "address"])]
        signature: Option<String>,
        /// Decode against a contract ABI JSON file
        #[arg(long, conflicts_with = "address")]
        abi: Option<PathBuf>,
        /// Fetch the verified ABI of this contract first
        #[arg(long)]
        address: Option<Address>,
        #[arg(long, default_value_t = 1)]
        chain_id: u64,
    },
    /// Encode a function call
    Encode {
        /// e.g. `transfer(address,uint256)`
        signature: String,
        /// Arguments; arrays and tuples as JSON, e.g. `[1,2]`
        args: Vec<String>,
        /// Leave the selector off
        #[arg(long)]
        no_selector: bool,
        /// abi.encodePacked instead of standard encoding
        #[arg(long, conflicts_with = "no_selector")]
        packed: bool,
    },
    /// Append encoded constructor arguments to creation bytecode
    Constructor {
        bytecode: String,
        /// e.g. `constructor(string,uint256)`
        #[arg(long)]
        signature: Option<String>,
        args: Vec<String>,
    },
    /// Print the 4-byte selector of a signature
    Selector { signature: String },
    /// Print the arguments as JSON with string booleans turned into booleans
    ConvertBooleans {
        signature: String,
        args: Vec<String>,
    },
}

impl Cli {
    pub fn adapter_config(&self) -> CalldataAdapterConfig {
        let mut cfg = CalldataAdapterConfig::from_env();
        if let Some(ms) = self.timeout_ms {
            cfg.http_timeout_ms = ms;
        }
        cfg
    }
}

pub async fn run(cli: Cli) -> Result<()> {
    let cfg = cli.adapter_config();
    match cli.command {
        Command::Decode {
            calldata,
            signature,
            abi,
            address,
            chain_id,
        } => {
            let request = DecodeRequest {
                calldata,
                signature,
                abi,
                address,
                chain_id,
            };
            if cli.offline {
                let decoder = CalldataDecoder::new(SelectorResolver::new(NoopLookup, NoopLookup));
                decode(&decoder, &request, None).await
            } else {
                let decoder = CalldataDecoder::new(
                    http_resolver(&cfg).wrap_err("failed to build signature lookups")?,
                );
                let abi_source =
                    SourcifyAbiSource::new(&cfg).wrap_err("failed to build abi source")?;
                decode(&decoder, &request, Some(&abi_source)).await
            }
        }
        Command::Encode {
            signature,
            args,
            no_selector,
            packed,
        } => {
            let function = parse_function(&signature)?;
            let values = convert_booleans_for_inputs(parse_args(&args), &function.inputs);
            let encoded = if packed {
                let types: Vec<String> = function
                    .inputs
                    .iter()
                    .map(|p| p.selector_type().into_owned())
                    .collect();
                let types: Vec<&str> = types.iter().map(String::as_str).collect();
                encode_packed(&types, &values)?
            } else if no_selector {
                encode_parameters(&function.inputs, &values)?
            } else {
                encode_function_call(FunctionSource::Abi(&function), &values)?
            };
            println!("{}", hex::encode_prefixed(&encoded));
            Ok(())
        }
        Command::Constructor {
            bytecode,
            signature,
            args,
        } => {
            let constructor = signature
                .as_deref()
                .map(parse_function)
                .transpose()?
                .map(|f| Constructor {
                    inputs: f.inputs,
                    state_mutability: StateMutability::NonPayable,
                });
            let values = match &constructor {
                Some(c) => convert_booleans_for_inputs(parse_args(&args), &c.inputs),
                None => parse_args(&args),
            };
            let encoded = encode_constructor(&bytecode, constructor.as_ref(), &values)?;
            println!("{}", hex::encode_prefixed(&encoded));
            Ok(())
        }
        Command::Selector { signature } => {
            let selector = selector_for(&signature)?;
            println!("{}", hex::encode_prefixed(selector));
            Ok(())
        }
        Command::ConvertBooleans { signature, args } => {
            let function = parse_function(&signature)?;
            let values = convert_booleans_for_inputs(parse_args(&args), &function.inputs);
            println!("{}", serde_json::to_string_pretty(&values)?);
            Ok(())
        }
    }
}

struct DecodeRequest {
    calldata: String,
    signature: Option<String>,
    abi: Option<PathBuf>,
    address: Option<Address>,
    chain_id: u64,
}

async fn decode<P, F>(
    decoder: &CalldataDecoder<P, F>,
    request: &DecodeRequest,
    abi_source: Option<&SourcifyAbiSource>,
) -> Result<()>
where
    P: SignatureLookupPort,
    F: SignatureLookupPort,
{
    let calldata = request.calldata.as_str();

    let output = if let Some(signature) = &request.signature {
        serde_json::to_value(decoder.decode_with_signature(calldata, signature).await?)?
    } else if let Some(path) = &request.abi {
        let raw = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("failed to read {}", path.display()))?;
        let abi: JsonAbi = serde_json::from_str(&raw).wrap_err("invalid ABI JSON")?;
        match decoder.decode_with_abi(calldata, &abi).await {
            Some(result) => serde_json::to_value(result)?,
            None => bail!("calldata does not match the ABI or any known signature"),
        }
    } else if let Some(address) = request.address {
        let Some(abi_source) = abi_source else {
            bail!("--address needs network access, drop --offline");
        };
        info!(%address, chain_id = request.chain_id, "fetching contract abi");
        match decoder
            .decode_with_address(calldata, address, request.chain_id, abi_source)
            .await
        {
            Some(result) => serde_json::to_value(result)?,
            None => bail!("could not decode calldata for {address}"),
        }
    } else {
        match decoder.decode_or_unparsed(calldata).await {
            Ok(result) => serde_json::to_value(result)?,
            Err(unparsed) => serde_json::json!({ "unparsed": unparsed }),
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn parse_function(signature: &str) -> Result<Function> {
    Function::parse(signature.trim()).wrap_err_with(|| format!("invalid signature '{signature}'"))
}

/// Command-line arguments as encoder input. JSON arrays, objects and
/// booleans are parsed, everything else stays a string so large integers
/// keep their precision.
pub fn parse_args(args: &[String]) -> Vec<Value> {
    args.iter().map(|arg| parse_arg(arg)).collect()
}

fn parse_arg(arg: &str) -> Value {
    let trimmed = arg.trim();
    let structured = trimmed.starts_with('[') || trimmed.starts_with('{');
    if structured || trimmed == "true" || trimmed == "false" {
        if let Ok(value) = serde_json::from_str(trimmed) {
            return value;
        }
    }
    Value::String(arg.to_owned())
}
