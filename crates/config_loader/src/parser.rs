//! 配置文本解析
//!
//! TOML 为主，JSON 用于程序生成的配置。缺省字段一律取默认值。

use contracts::{ContractError, ProcessorConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
}

impl ConfigFormat {
    /// 按扩展名识别，大小写不敏感
    pub fn from_extension(ext: &str) -> Option<Self> {
        if ext.eq_ignore_ascii_case("toml") {
            Some(Self::Toml)
        } else if ext.eq_ignore_ascii_case("json") {
            Some(Self::Json)
        } else {
            None
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Toml => "TOML",
            Self::Json => "JSON",
        }
    }

    /// 只做反序列化，不做校验
    pub fn parse(self, content: &str) -> Result<ProcessorConfig, ContractError> {
        let parsed = match self {
            Self::Toml => toml::from_str(content).map_err(|e| Box::new(e) as BoxedError),
            Self::Json => serde_json::from_str(content).map_err(|e| Box::new(e) as BoxedError),
        };
        parsed.map_err(|e| ContractError::ConfigParse {
            message: format!("{} config: {e}", self.label()),
            source: Some(e),
        })
    }
}

type BoxedError = Box<dyn std::error::Error + Send + Sync>;

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{EventShowType, Rotation, SensorMode};

    #[test]
    fn test_parse_toml_sections() {
        let content = r#"
[sensor]
rows = 100
cols = 200
mipi_format = 1

[mode]
fixed = "event_intensity"
iso_level = 4

[event]
clock_mhz = 50
rotation = "deg180"
show = { method = "by_count", events = 500 }
"#;
        let result = ConfigFormat::Toml.parse(content);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let cfg = result.unwrap();
        assert_eq!(cfg.sensor.rows, 100);
        assert_eq!(cfg.sensor.mipi_format, 1);
        assert_eq!(cfg.mode.fixed, SensorMode::EventIntensity);
        assert_eq!(cfg.event.show, EventShowType::ByCount { events: 500 });
        assert_eq!(cfg.event.rotation, Rotation::Deg180);
        // 未写的字段取默认值
        assert_eq!(cfg.event.count_step, 9);
        assert!(cfg.modules.imu);
    }

    #[test]
    fn test_parse_json_minimal() {
        let content = r#"{
            "mode": { "loop_enabled": true },
            "event": { "show": { "method": "by_step" } },
            "modules": { "frame": true, "imu": false }
        }"#;
        let result = ConfigFormat::Json.parse(content);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let cfg = result.unwrap();
        assert!(cfg.mode.loop_enabled);
        assert!(!cfg.modules.imu);
    }

    #[test]
    fn test_parse_toml_syntax_error() {
        let err = ConfigFormat::Toml.parse("[sensor\nrows = 8").unwrap_err();
        match err {
            ContractError::ConfigParse { message, source } => {
                assert!(message.starts_with("TOML config"));
                assert!(source.is_some());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_mode_rejected() {
        let result = ConfigFormat::Toml.parse("[mode]\nfixed = \"warp_drive\"\n");
        assert!(matches!(result, Err(ContractError::ConfigParse { .. })));
    }

    #[test]
    fn test_extension_lookup() {
        for (ext, expected) in [
            ("toml", Some(ConfigFormat::Toml)),
            ("Toml", Some(ConfigFormat::Toml)),
            ("JSON", Some(ConfigFormat::Json)),
            ("yml", None),
        ] {
            assert_eq!(ConfigFormat::from_extension(ext), expected, "{ext}");
        }
    }
}
