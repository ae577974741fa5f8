//! JSON-RPC surface
//!
//! Parses JSON parameters and options, calls the node, and renders results
//! as JSON. Hashes, salts and addresses travel as lowercase hex.

use serde_json::{json, Map, Value};
use lib_names::{CommitmentHash, HistoryEntry, Name, NameValue, Salt, SALT_LENGTH};
use lib_types::{Address, OutPoint, TxHash};

use crate::errors::{NodeError, NodeResult};
use crate::node::{CommitmentHandle, NameInfo, NameNode, NameOptions, PendingOp};

/// Default page size of `name_scan`
pub const DEFAULT_SCAN_COUNT: usize = 500;

// =============================================================================
// Parameter Parsing
// =============================================================================

/// Parse the optional options object of `name_new`, `name_firstupdate`
/// and `name_update`
pub fn parse_options(value: Option<&Value>) -> NodeResult<NameOptions> {
    let object = match value {
        None | Some(Value::Null) => return Ok(NameOptions::default()),
        Some(Value::Object(object)) => object,
        Some(_) => return Err(NodeError::malformed("options", "object")),
    };

    let dest_address = match object.get("destAddress") {
        None | Some(Value::Null) => None,
        Some(Value::String(text)) => Some(parse_address(text)?),
        Some(_) => return Err(NodeError::malformed("destAddress", "string")),
    };
    let allow_existing = match object.get("allowExisting") {
        None | Some(Value::Null) => false,
        Some(Value::Bool(flag)) => *flag,
        Some(_) => return Err(NodeError::malformed("allowExisting", "bool")),
    };

    Ok(NameOptions {
        dest_address,
        allow_existing,
    })
}

pub fn parse_address(text: &str) -> NodeResult<Address> {
    decode_array::<32>(text)
        .map(Address::new)
        .ok_or_else(|| NodeError::InvalidAddress(text.to_string()))
}

fn decode_array<const N: usize>(text: &str) -> Option<[u8; N]> {
    let mut bytes = [0u8; N];
    hex::decode_to_slice(text, &mut bytes).ok()?;
    Some(bytes)
}

fn param<'a>(params: &'a [Value], index: usize, label: &str) -> NodeResult<&'a Value> {
    params
        .get(index)
        .ok_or_else(|| NodeError::invalid_parameter(format!("missing parameter {}", label)))
}

fn str_param<'a>(params: &'a [Value], index: usize, label: &str) -> NodeResult<&'a str> {
    param(params, index, label)?
        .as_str()
        .ok_or_else(|| NodeError::malformed(label, "string"))
}

fn optional_str_param<'a>(params: &'a [Value], index: usize, label: &str) -> NodeResult<Option<&'a str>> {
    match params.get(index) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => Ok(Some(text.as_str())),
        Some(_) => Err(NodeError::malformed(label, "string")),
    }
}

fn count_param(params: &[Value], index: usize, label: &str, default: u64) -> NodeResult<u64> {
    match params.get(index) {
        None | Some(Value::Null) => Ok(default),
        Some(value) => value.as_u64().ok_or_else(|| NodeError::malformed(label, "number")),
    }
}

/// Rebuild a commitment handle from `name`, hex `rand` and hex `txid`
pub fn handle_from_parts(name: Name, rand: &str, txid: &str) -> NodeResult<CommitmentHandle> {
    let salt = decode_array::<SALT_LENGTH>(rand)
        .map(Salt::new)
        .ok_or_else(|| NodeError::invalid_parameter("rand must be 20 bytes of hex"))?;
    let tx_hash = decode_array::<32>(txid)
        .map(TxHash::new)
        .ok_or_else(|| NodeError::invalid_parameter("txid must be 32 bytes of hex"))?;
    Ok(CommitmentHandle {
        commitment: CommitmentHash::compute(&name, &salt),
        output: OutPoint::new(tx_hash, 0),
        tx_hash,
        name,
        salt,
    })
}

// =============================================================================
// Rendering
// =============================================================================

fn outpoint_json(outpoint: &OutPoint) -> Value {
    json!({
        "txid": outpoint.tx_hash.to_string(),
        "vout": outpoint.output_index,
    })
}

pub fn name_info_json(info: &NameInfo) -> Value {
    json!({
        "name": info.name.to_string(),
        "value": info.value.to_string(),
        "txid": info.txid.to_string(),
        "output": outpoint_json(&info.owning_output),
        "address": hex::encode(info.owner.as_bytes()),
        "height": info.height,
        "expires_at": info.expires_at,
        "expires_in": info.remaining_blocks,
        "expired": info.expired,
    })
}

fn history_json(entry: &HistoryEntry) -> Value {
    json!({
        "value": entry.value.to_string(),
        "txid": entry.txid.to_string(),
        "height": entry.height,
    })
}

fn pending_json(op: &PendingOp) -> Value {
    let mut object = Map::new();
    object.insert("txid".into(), Value::String(op.tx_hash.to_string()));
    object.insert("op".into(), Value::String(op.op.to_string()));
    if let Some(name) = &op.name {
        object.insert("name".into(), Value::String(name.to_string()));
    }
    if let Some(value) = &op.value {
        object.insert("value".into(), Value::String(value.to_string()));
    }
    Value::Object(object)
}

fn handle_json(handle: &CommitmentHandle) -> Value {
    json!({
        "txid": handle.tx_hash.to_string(),
        "rand": hex::encode(handle.salt.as_bytes()),
        "commitment": handle.commitment.to_string(),
    })
}

/// JSON-RPC error object
pub fn error_json(error: &NodeError) -> Value {
    json!({
        "code": error.rpc_code(),
        "message": error.to_string(),
    })
}

// =============================================================================
// Dispatch
// =============================================================================

/// Execute one RPC call against `node`
pub fn dispatch(node: &NameNode, method: &str, params: &[Value]) -> NodeResult<Value> {
    match method {
        "name_new" => {
            let name = Name::from(str_param(params, 0, "name")?);
            let options = parse_options(params.get(1))?;
            let handle = node.register_intent(&name, &options)?;
            Ok(handle_json(&handle))
        }
        "name_firstupdate" => {
            let name = Name::from(str_param(params, 0, "name")?);
            let handle = handle_from_parts(
                name,
                str_param(params, 1, "rand")?,
                str_param(params, 2, "txid")?,
            )?;
            let value = NameValue::from(str_param(params, 3, "value")?);
            let options = parse_options(params.get(4))?;
            let txid = node.reveal_registration(&handle, &value, &options)?;
            Ok(Value::String(txid.to_string()))
        }
        "name_update" => {
            let name = Name::from(str_param(params, 0, "name")?);
            let value = NameValue::from(str_param(params, 1, "value")?);
            let options = parse_options(params.get(2))?;
            let txid = node.update_name(&name, &value, &options)?;
            Ok(Value::String(txid.to_string()))
        }
        "name_show" => {
            let name = Name::from(str_param(params, 0, "name")?);
            Ok(name_info_json(&node.query_name(&name)?))
        }
        "name_history" => {
            let name = Name::from(str_param(params, 0, "name")?);
            let entries = node.query_history(&name)?;
            Ok(Value::Array(entries.iter().map(history_json).collect()))
        }
        "name_pending" => {
            let name = optional_str_param(params, 0, "name")?.map(Name::from);
            let pending = node.pending_operations(name.as_ref());
            Ok(Value::Array(pending.iter().map(pending_json).collect()))
        }
        "name_scan" => {
            let start = optional_str_param(params, 0, "start")?.map(Name::from);
            let count = count_param(params, 1, "count", DEFAULT_SCAN_COUNT as u64)?;
            let infos = node.scan_names(start.as_ref(), count as usize);
            Ok(Value::Array(infos.iter().map(name_info_json).collect()))
        }
        "generate" => {
            let count = count_param(params, 0, "count", 1)?;
            let outcomes = node.mine_blocks(count)?;
            Ok(Value::Array(outcomes.iter().map(|o| json!(o.height)).collect()))
        }
        "getblockcount" => Ok(json!(node.tip())),
        other => Err(NodeError::UnknownMethod(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NodeConfig;
    use crate::errors::RPC_METHOD_NOT_FOUND;

    #[test]
    fn test_parse_options() {
        assert_eq!(parse_options(None).unwrap(), NameOptions::default());

        let options = parse_options(Some(&json!({
            "allowExisting": true,
            "destAddress": "07".repeat(32),
        })))
        .unwrap();
        assert!(options.allow_existing);
        assert_eq!(options.dest_address, Some(Address::new([7; 32])));
    }

    #[test]
    fn test_malformed_options() {
        let err = parse_options(Some(&json!({"allowExisting": 42.5}))).unwrap_err();
        assert_eq!(err.to_string(), "Expected type bool for allowExisting");
        assert_eq!(err.rpc_code(), -3);

        let err = parse_options(Some(&json!({"destAddress": "zz"}))).unwrap_err();
        assert_eq!(err, NodeError::InvalidAddress("zz".to_string()));

        assert!(parse_options(Some(&json!([true]))).is_err());
    }

    #[test]
    fn test_dispatch_round_trip() {
        let node = NameNode::new(&NodeConfig::regtest(true));
        let handle = dispatch(&node, "name_new", &[json!("alpha")]).unwrap();
        let rand = handle["rand"].as_str().unwrap().to_string();
        let txid = handle["txid"].as_str().unwrap().to_string();

        dispatch(&node, "generate", &[json!(12)]).unwrap();
        dispatch(
            &node,
            "name_firstupdate",
            &[json!("alpha"), json!(rand), json!(txid), json!("v1")],
        )
        .unwrap();

        let pending = dispatch(&node, "name_pending", &[]).unwrap();
        assert_eq!(pending[0]["op"], "name_firstupdate");
        assert_eq!(pending[0]["name"], "alpha");

        dispatch(&node, "generate", &[]).unwrap();
        let shown = dispatch(&node, "name_show", &[json!("alpha")]).unwrap();
        assert_eq!(shown["value"], "v1");
        assert_eq!(shown["height"], 13);
        assert_eq!(shown["expires_in"], 30);
        assert_eq!(shown["expired"], false);

        let history = dispatch(&node, "name_history", &[json!("alpha")]).unwrap();
        assert_eq!(history.as_array().unwrap().len(), 1);

        let scanned = dispatch(&node, "name_scan", &[json!("a"), json!(10)]).unwrap();
        assert_eq!(scanned.as_array().unwrap().len(), 1);
        assert_eq!(dispatch(&node, "getblockcount", &[]).unwrap(), json!(13));
    }

    #[test]
    fn test_dispatch_errors() {
        let node = NameNode::new(&NodeConfig::regtest(false));
        let err = dispatch(&node, "name_show", &[json!("missing")]).unwrap_err();
        assert_eq!(err.rpc_code(), -4);
        assert!(err.to_string().contains("name not found"));

        let err = dispatch(&node, "name_history", &[json!("missing")]).unwrap_err();
        assert_eq!(err.rpc_code(), -1);
        assert_eq!(err.to_string(), "namehistory is not enabled");

        let err = dispatch(&node, "name_show", &[json!(5)]).unwrap_err();
        assert_eq!(err.rpc_code(), -3);

        let err = dispatch(&node, "name_show", &[]).unwrap_err();
        assert_eq!(err.rpc_code(), -8);

        let err = dispatch(&node, "name_teleport", &[]).unwrap_err();
        assert_eq!(error_json(&err)["code"], RPC_METHOD_NOT_FOUND);
    }
}
