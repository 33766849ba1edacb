use std::env;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::http_cache::app_cache_dir;
use crate::margin_model::{FitConfig, FittedModel};
use crate::rating::RatingConfig;
use crate::rollup;

const MODEL_FILE: &str = "fitted_margin_model.json";

/// Tunables for one pipeline run. Everything has a sane default and an env
/// override so backtests can sweep parameters without code edits.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub window: usize,
    pub ridge_alpha: f64,
    pub sigma_fallback: f64,
    pub elo_k: f64,
    pub elo_home_adv: f64,
    pub kelly_cap: f64,
    pub preferred_books: Vec<String>,
    pub train_season_from: u16,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            window: rollup::DEFAULT_WINDOW,
            ridge_alpha: 5.0,
            sigma_fallback: 13.5,
            elo_k: 20.0,
            elo_home_adv: 55.0,
            kelly_cap: 0.05,
            preferred_books: vec!["draftkings".to_string()],
            train_season_from: 2018,
        }
    }
}

impl PipelineConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            window: env_usize("EDGE_ROLLUP_WINDOW", d.window).clamp(1, 17),
            ridge_alpha: env_f64("EDGE_RIDGE_ALPHA", d.ridge_alpha).clamp(0.0, 1000.0),
            sigma_fallback: env_f64("EDGE_SIGMA_FALLBACK", d.sigma_fallback).clamp(3.0, 30.0),
            elo_k: env_f64("EDGE_ELO_K", d.elo_k).clamp(1.0, 60.0),
            elo_home_adv: env_f64("EDGE_ELO_HOME_ADV", d.elo_home_adv).clamp(0.0, 200.0),
            kelly_cap: env_f64("EDGE_KELLY_CAP", d.kelly_cap).clamp(0.0, 0.25),
            preferred_books: env_books("EDGE_PREFERRED_BOOKS", d.preferred_books),
            train_season_from: env_usize("EDGE_TRAIN_SEASON_FROM", usize::from(d.train_season_from))
                .clamp(2002, 2100) as u16,
        }
    }

    pub fn rating_config(&self) -> RatingConfig {
        RatingConfig {
            k: self.elo_k,
            home_adv_pts: self.elo_home_adv,
        }
    }

    pub fn fit_config(&self) -> FitConfig {
        FitConfig {
            ridge_alpha: self.ridge_alpha,
            sigma_fallback: self.sigma_fallback,
            ..FitConfig::default()
        }
    }
}

fn env_f64(key: &str, default: f64) -> f64 {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<f64>().ok())
        .unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(default)
}

fn env_books(key: &str, default: Vec<String>) -> Vec<String> {
    let Ok(raw) = env::var(key) else {
        return default;
    };
    let books: Vec<String> = raw
        .split([',', ';'])
        .map(|b| b.trim().to_ascii_lowercase())
        .filter(|b| !b.is_empty())
        .collect();
    if books.is_empty() { default } else { books }
}

/// Last fitted margin model, if one was persisted by a previous run.
pub fn load_cached_model() -> Option<FittedModel> {
    let path = model_path()?;
    let raw = fs::read_to_string(path).ok()?;
    serde_json::from_str::<FittedModel>(&raw).ok()
}

pub fn save_cached_model(model: &FittedModel) -> Result<()> {
    let Some(path) = model_path() else {
        return Ok(());
    };
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    let tmp = path.with_extension("json.tmp");
    let json = serde_json::to_string(model).context("serialize fitted model")?;
    fs::write(&tmp, json).context("write fitted model")?;
    fs::rename(&tmp, &path).context("swap fitted model")?;
    Ok(())
}

fn model_path() -> Option<PathBuf> {
    app_cache_dir().map(|dir| dir.join(MODEL_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_in_range() {
        let cfg = PipelineConfig::default();
        assert_eq!(cfg.window, 5);
        assert_eq!(cfg.kelly_cap, 0.05);
        assert_eq!(cfg.preferred_books, vec!["draftkings".to_string()]);
    }

    #[test]
    fn book_list_parsing_lowercases_and_drops_empties() {
        let books = env_books("EDGE_TEST_NO_SUCH_VAR", vec!["draftkings".to_string()]);
        assert_eq!(books, vec!["draftkings".to_string()]);
    }
}
