//! Configuration validation.
//!
//! Every config surface is checked before a run starts; an invalid value is
//! fatal at construction time, never discovered mid-run.

use crate::domain::engine::FillMode;
use crate::domain::error::TradesimError;
use crate::ports::config_port::ConfigPort;

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), TradesimError> {
    validate_initial_capital(config)?;
    validate_fill_mode(config)?;
    validate_bars_per_year(config)?;
    validate_risk_free_rate(config)?;
    validate_commission(config)?;
    validate_slippage(config)?;
    validate_atr_period(config)?;
    validate_symbols(config)?;
    Ok(())
}

pub fn validate_risk_config(config: &dyn ConfigPort) -> Result<(), TradesimError> {
    validate_risk_per_trade(config)?;
    validate_stop_method(config)?;
    validate_take_profit_rr(config)?;
    validate_lot_size(config)?;
    Ok(())
}

pub fn validate_strategy_config(config: &dyn ConfigPort) -> Result<(), TradesimError> {
    let kind = config
        .get_string("strategy", "kind")
        .ok_or_else(|| TradesimError::ConfigMissing {
            section: "strategy".to_string(),
            key: "kind".to_string(),
        })?;

    match kind.as_str() {
        "mean_reversion" => {
            let window = config.get_int("strategy", "window", 30);
            if window <= 0 {
                return Err(invalid("strategy", "window", "window must be positive"));
            }
            let threshold = config.get_double("strategy", "threshold", 1.5);
            if threshold <= 0.0 {
                return Err(invalid("strategy", "threshold", "threshold must be positive"));
            }
            Ok(())
        }
        "trend_following" => {
            let fast = config.get_int("strategy", "fast", 10);
            let slow = config.get_int("strategy", "slow", 30);
            if fast <= 0 {
                return Err(invalid("strategy", "fast", "fast period must be positive"));
            }
            if slow <= fast {
                return Err(invalid(
                    "strategy",
                    "slow",
                    "slow period must exceed fast period",
                ));
            }
            Ok(())
        }
        other => Err(invalid(
            "strategy",
            "kind",
            &format!("unknown strategy kind '{other}'"),
        )),
    }
}

fn invalid(section: &str, key: &str, reason: &str) -> TradesimError {
    TradesimError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

fn validate_initial_capital(config: &dyn ConfigPort) -> Result<(), TradesimError> {
    let value = config.get_double("backtest", "initial_capital", 0.0);
    if value <= 0.0 {
        return Err(invalid(
            "backtest",
            "initial_capital",
            "initial_capital must be positive",
        ));
    }
    Ok(())
}

fn validate_fill_mode(config: &dyn ConfigPort) -> Result<(), TradesimError> {
    match config.get_string("backtest", "fill_mode") {
        None => Ok(()),
        Some(value) if FillMode::parse(&value).is_some() => Ok(()),
        Some(value) => Err(invalid(
            "backtest",
            "fill_mode",
            &format!("expected next_bar_open or same_bar_close, got '{value}'"),
        )),
    }
}

fn validate_bars_per_year(config: &dyn ConfigPort) -> Result<(), TradesimError> {
    let value = config.get_double("backtest", "bars_per_year", 252.0);
    if value <= 0.0 {
        return Err(invalid(
            "backtest",
            "bars_per_year",
            "bars_per_year must be positive",
        ));
    }
    Ok(())
}

fn validate_risk_free_rate(config: &dyn ConfigPort) -> Result<(), TradesimError> {
    let value = config.get_double("backtest", "risk_free_rate", 0.0);
    if !(0.0..1.0).contains(&value) {
        return Err(invalid(
            "backtest",
            "risk_free_rate",
            "risk_free_rate must be between 0 and 1",
        ));
    }
    Ok(())
}

fn validate_commission(config: &dyn ConfigPort) -> Result<(), TradesimError> {
    if config.get_double("backtest", "commission_per_trade", 0.0) < 0.0 {
        return Err(invalid(
            "backtest",
            "commission_per_trade",
            "commission_per_trade must be non-negative",
        ));
    }
    if config.get_double("backtest", "commission_pct", 0.0) < 0.0 {
        return Err(invalid(
            "backtest",
            "commission_pct",
            "commission_pct must be non-negative",
        ));
    }
    Ok(())
}

fn validate_slippage(config: &dyn ConfigPort) -> Result<(), TradesimError> {
    if config.get_double("backtest", "slippage_pct", 0.0) < 0.0 {
        return Err(invalid(
            "backtest",
            "slippage_pct",
            "slippage_pct must be non-negative",
        ));
    }
    Ok(())
}

fn validate_atr_period(config: &dyn ConfigPort) -> Result<(), TradesimError> {
    if config.get_int("backtest", "atr_period", 14) <= 0 {
        return Err(invalid(
            "backtest",
            "atr_period",
            "atr_period must be positive",
        ));
    }
    Ok(())
}

fn validate_symbols(config: &dyn ConfigPort) -> Result<(), TradesimError> {
    let symbols = config.get_string("backtest", "symbols");
    let symbol = config.get_string("backtest", "symbol");
    match (symbols, symbol) {
        (Some(s), _) if !s.trim().is_empty() => Ok(()),
        (None, Some(s)) if !s.trim().is_empty() => Ok(()),
        _ => Err(TradesimError::ConfigMissing {
            section: "backtest".to_string(),
            key: "symbol".to_string(),
        }),
    }
}

fn validate_risk_per_trade(config: &dyn ConfigPort) -> Result<(), TradesimError> {
    let value = config.get_double("risk", "risk_per_trade", 0.01);
    if value <= 0.0 || value > 1.0 {
        return Err(invalid(
            "risk",
            "risk_per_trade",
            "risk_per_trade must be in (0, 1]",
        ));
    }
    Ok(())
}

fn validate_stop_method(config: &dyn ConfigPort) -> Result<(), TradesimError> {
    let method = config
        .get_string("risk", "stop_method")
        .unwrap_or_else(|| "fixed_pct".to_string());
    match method.as_str() {
        "atr" => {
            let mult = config.get_double("risk", "atr_multiple", 2.0);
            if mult <= 0.0 {
                return Err(invalid("risk", "atr_multiple", "atr_multiple must be positive"));
            }
            Ok(())
        }
        "fixed_pct" => {
            let pct = config.get_double("risk", "stop_pct", 2.0);
            if pct <= 0.0 || pct >= 100.0 {
                return Err(invalid("risk", "stop_pct", "stop_pct must be in (0, 100)"));
            }
            Ok(())
        }
        other => Err(invalid(
            "risk",
            "stop_method",
            &format!("expected atr or fixed_pct, got '{other}'"),
        )),
    }
}

fn validate_take_profit_rr(config: &dyn ConfigPort) -> Result<(), TradesimError> {
    let value = config.get_double("risk", "take_profit_rr", 0.0);
    if value < 0.0 {
        return Err(invalid(
            "risk",
            "take_profit_rr",
            "take_profit_rr must be non-negative",
        ));
    }
    Ok(())
}

fn validate_lot_size(config: &dyn ConfigPort) -> Result<(), TradesimError> {
    let value = config.get_double("risk", "lot_size", 1.0);
    if value <= 0.0 {
        return Err(invalid("risk", "lot_size", "lot_size must be positive"));
    }
    Ok(())
}
