//! 配置校验模块
//!
//! 校验规则：
//! - server.listen 非空
//! - output.extension 不含路径分隔符
//! - lims.url 必须是 http(s) 且包含主机
//! - lims.retries >= 1, 0 <= lims.delay_secs <= MAX_DELAY_SECS
//! - wrappers.sender 非空且唯一（忽略大小写）
//!
//! 目录是否存在、LIMS 是否可达属于启动检查，不在此处处理。

use std::collections::HashSet;

use contracts::{BridgeConfig, ContractError, LimsConfig, MAX_DELAY_SECS};
use validator::{Validate, ValidationErrors};

/// 校验 BridgeConfig 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(config: &BridgeConfig) -> Result<(), ContractError> {
    validate_server(config)?;
    validate_output(config)?;
    validate_lims(config)?;
    validate_wrappers(config)?;
    Ok(())
}

/// 校验监听地址
fn validate_server(config: &BridgeConfig) -> Result<(), ContractError> {
    if config.server.listen.trim().is_empty() {
        return Err(ContractError::config_validation(
            "server.listen",
            "listen address cannot be empty",
        ));
    }
    Ok(())
}

/// 校验输出配置
fn validate_output(config: &BridgeConfig) -> Result<(), ContractError> {
    let Some(output) = &config.output else {
        return Ok(());
    };

    if output.directory.as_os_str().is_empty() {
        return Err(ContractError::config_validation(
            "output.directory",
            "output directory cannot be empty",
        ));
    }

    if output.extension.contains(['/', '\\']) {
        return Err(ContractError::config_validation(
            "output.extension",
            format!(
                "extension '{}' must not contain path separators",
                output.extension
            ),
        ));
    }
    Ok(())
}

/// 校验 LIMS 推送配置
fn validate_lims(config: &BridgeConfig) -> Result<(), ContractError> {
    let Some(lims) = &config.lims else {
        return Ok(());
    };

    lims.validate()
        .map_err(|e| ContractError::config_validation("lims", describe(&e)))?;

    if !lims.delay_secs.is_finite() {
        return Err(ContractError::config_validation(
            "lims.delay_secs",
            format!("delay_secs must be a finite number, got {}", lims.delay_secs),
        ));
    }
    if lims.delay_secs > MAX_DELAY_SECS {
        return Err(ContractError::config_validation(
            "lims.delay_secs",
            format!(
                "delay_secs must be <= {MAX_DELAY_SECS}, got {}",
                lims.delay_secs
            ),
        ));
    }

    validate_lims_url(lims)
}

/// 校验 URL 协议与主机
fn validate_lims_url(lims: &LimsConfig) -> Result<(), ContractError> {
    let scheme = lims.url.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(ContractError::config_validation(
            "lims.url",
            format!("unsupported scheme '{scheme}', expected http or https"),
        ));
    }
    if lims.url.host_str().is_none_or(str::is_empty) {
        return Err(ContractError::config_validation(
            "lims.url",
            "url must include a host",
        ));
    }
    Ok(())
}

/// 校验 wrapper 注册
///
/// 同一 sender 注册两次属于配置错误，而不是运行时歧义。
fn validate_wrappers(config: &BridgeConfig) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, wrapper) in config.wrappers.iter().enumerate() {
        wrapper.validate().map_err(|e| {
            ContractError::config_validation(format!("wrappers[{idx}]"), describe(&e))
        })?;

        if !seen.insert(wrapper.sender.to_lowercase()) {
            return Err(ContractError::config_validation(
                format!("wrappers[sender={}]", wrapper.sender),
                "duplicate wrapper sender",
            ));
        }
    }
    Ok(())
}

/// 将 validator 错误整理为单行描述
fn describe(errors: &ValidationErrors) -> String {
    let mut messages: Vec<String> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |err| match &err.message {
                Some(message) => message.to_string(),
                None => format!("{field}: {}", err.code),
            })
        })
        .collect();
    messages.sort();
    messages.join("; ")
}
