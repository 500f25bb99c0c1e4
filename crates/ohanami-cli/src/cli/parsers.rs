use ohanami_core::config::{parse_bool_flag, parse_max_depth};

pub(super) fn parse_bool_token(raw: &str) -> std::result::Result<bool, String> {
    parse_bool_flag(raw).ok_or_else(|| format!("invalid boolean value '{raw}' (expected true or false)"))
}

pub(super) fn parse_min_one_u64(raw: &str) -> std::result::Result<u64, String> {
    let value = raw
        .parse::<u64>()
        .map_err(|_| format!("invalid integer value '{raw}'"))?;
    if value == 0 {
        return Err("value must be >= 1".to_string());
    }
    Ok(value)
}

pub(super) fn parse_min_one_usize(raw: &str) -> std::result::Result<usize, String> {
    let value = raw
        .parse::<usize>()
        .map_err(|_| format!("invalid integer value '{raw}'"))?;
    if value == 0 {
        return Err("value must be >= 1".to_string());
    }
    Ok(value)
}

pub(super) fn parse_depth(raw: &str) -> std::result::Result<usize, String> {
    parse_max_depth(raw).map_err(|err| err.to_string())
}
