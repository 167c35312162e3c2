use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::models::{PRICE_PER_TB_SCAN, TransformerContext};

/// Pricing and input defaults of a recommendation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OptimizerConfig {
    /// On-demand list price of one scanned TB.
    #[serde(default = "default_price_per_tb_scan")]
    pub price_per_tb_scan: f64,

    /// Multiplier applied to list prices when the customer carries no
    /// discount of its own. 1.0 means no discount.
    #[serde(default = "default_discount")]
    pub default_discount: f64,

    /// Whether table discovery data is available. Without it, queries that
    /// read the discovery table are skipped.
    #[serde(default)]
    pub has_discovery_data: bool,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            price_per_tb_scan: default_price_per_tb_scan(),
            default_discount: default_discount(),
            has_discovery_data: false,
        }
    }
}

impl OptimizerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.default_discount > 0.0 && self.default_discount <= 1.0) {
            return Err(ConfigError::Validation(format!(
                "optimizer.default_discount must be in (0, 1], got {}",
                self.default_discount
            )));
        }
        if !(self.price_per_tb_scan.is_finite() && self.price_per_tb_scan > 0.0) {
            return Err(ConfigError::Validation(format!(
                "optimizer.price_per_tb_scan must be positive, got {}",
                self.price_per_tb_scan
            )));
        }
        Ok(())
    }

    /// A transformer context carrying the configured prices and no totals.
    pub fn transformer_context(&self) -> TransformerContext {
        TransformerContext {
            discount: self.default_discount,
            price_per_tb_scan: self.price_per_tb_scan,
            ..TransformerContext::default()
        }
    }
}

fn default_price_per_tb_scan() -> f64 {
    PRICE_PER_TB_SCAN
}

fn default_discount() -> f64 {
    1.0
}
