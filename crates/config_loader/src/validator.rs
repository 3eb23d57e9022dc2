//! 配置校验模块
//!
//! 校验规则：
//! - 字段范围与模式组合 (`ProcessorConfig::validate_all`，含全幅/光流的 ADC 格式要求)
//! - ByTime 下 start_pos 必须小于帧长
//! - fpn.path 指向已存在的文件

use contracts::{ContractError, EventShowType, ProcessorConfig};

/// 校验 ProcessorConfig 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(config: &ProcessorConfig) -> Result<(), ContractError> {
    config.validate_all()?;
    validate_start_pos(config)?;
    validate_fpn_path(config)?;
    Ok(())
}

/// 校验事件帧起始位置
fn validate_start_pos(config: &ProcessorConfig) -> Result<(), ContractError> {
    let event = &config.event;
    if let (EventShowType::ByTime { .. }, Some(units)) = (event.show, event.frame_time_units()) {
        if event.start_pos >= units {
            return Err(ContractError::config_validation(
                "event.start_pos",
                format!(
                    "start_pos {} would drop every event of a {}-unit frame",
                    event.start_pos, units
                ),
            ));
        }
    }
    Ok(())
}

/// 校验 FPN 文件
fn validate_fpn_path(config: &ProcessorConfig) -> Result<(), ContractError> {
    match &config.fpn.path {
        Some(path) if !path.is_file() => Err(ContractError::config_validation(
            "fpn.path",
            format!("file not found: {}", path.display()),
        )),
        _ => Ok(()),
    }
}
