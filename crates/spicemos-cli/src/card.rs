//! JSON device cards and the test bench built from them.
//!
//! A card names one model and one instance:
//!
//! ```text
//! {
//!   "model": { "name": "nch", "type": "nmos", "level": 1, "vto": 0.7, "kp": 2e-5 },
//!   "instance": { "w": 10e-6, "l": 2e-6 },
//!   "options": { "temp": 300.15 }
//! }
//! ```
//!
//! Every model and instance key other than `name`, `type` and `level` is
//! passed to `set_by_name`, so any card name the device accepts works.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use indexmap::IndexMap;
use serde::Deserialize;
use spicemos_core::{NodeId, SimOptions};
use spicemos_devices::{MosLevel, MosModel, Mosfet, Polarity};
use spicemos_solver::{Circuit, VoltageSource};

#[derive(Debug, Clone, Deserialize)]
pub struct Card {
    pub model: ModelCard,
    #[serde(default)]
    pub instance: IndexMap<String, f64>,
    #[serde(default)]
    pub options: SimOptions,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelCard {
    #[serde(default = "default_model_name")]
    pub name: String,
    #[serde(rename = "type", default = "default_polarity")]
    pub polarity: String,
    #[serde(default = "default_level")]
    pub level: i64,
    #[serde(flatten)]
    pub params: IndexMap<String, f64>,
}

fn default_model_name() -> String {
    "mod".to_string()
}

fn default_polarity() -> String {
    "nmos".to_string()
}

fn default_level() -> i64 {
    1
}

/// Terminal voltages applied by the bench sources.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bias {
    pub vd: f64,
    pub vg: f64,
    pub vs: f64,
    pub vb: f64,
}

/// Names of the sources driving each terminal.
pub const SOURCES: [&str; 4] = ["vd", "vg", "vs", "vb"];

/// Name of the device under test.
pub const DEVICE: &str = "m1";

impl Card {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("malformed device card")
    }

    pub fn read(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("in {}", path.display()))
    }

    pub fn build_model(&self) -> Result<MosModel> {
        let polarity = match self.model.polarity.to_ascii_lowercase().as_str() {
            "nmos" | "n" => Polarity::N,
            "pmos" | "p" => Polarity::P,
            other => bail!("model type must be nmos or pmos, got {other:?}"),
        };
        let Some(level) = MosLevel::from_number(self.model.level) else {
            bail!("unsupported MOSFET level {}", self.model.level);
        };
        let mut model = MosModel::new(&self.model.name, polarity, level);
        for (key, &value) in &self.model.params {
            model
                .set_by_name(key, value)
                .with_context(|| format!("model {}", self.model.name))?;
        }
        Ok(model)
    }

    /// Device with each terminal driven by its own DC source.
    pub fn bench(&self, bias: Bias) -> Result<Circuit> {
        let mut circuit = Circuit::new(self.options.clone());
        let nodes = ["d", "g", "s", "b"].map(|n| circuit.node(n));
        let levels = [bias.vd, bias.vg, bias.vs, bias.vb];
        for ((name, node), value) in SOURCES.into_iter().zip(nodes).zip(levels) {
            let source = VoltageSource::dc(name, node, NodeId::GROUND, value);
            // The gate source carries the AC stimulus.
            let source = if name == "vg" { source.with_ac(1.0) } else { source };
            circuit.add(source);
        }
        let [d, g, s, b] = nodes;
        let mut device = Mosfet::new(DEVICE, Arc::new(self.build_model()?), d, g, s, b);
        for (key, &value) in &self.instance {
            device
                .set_by_name(key, value)
                .with_context(|| format!("instance {DEVICE}"))?;
        }
        circuit.add(device);
        Ok(circuit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spicemos_devices::ModelParam;

    const CARD: &str = r#"{
        "model": { "name": "pch", "type": "pmos", "level": 3, "vto": -0.8, "tox": 2e-8 },
        "instance": { "w": 4e-6, "l": 1e-6 },
        "options": { "temp": 350.0 }
    }"#;

    #[test]
    fn test_card_parses_model_and_options() {
        let card = Card::from_json(CARD).unwrap();
        let model = card.build_model().unwrap();
        assert_eq!(model.polarity(), Polarity::P);
        assert_eq!(model.level(), MosLevel::Three);
        assert_eq!(model.get(ModelParam::Vto), -0.8);
        assert!(model.is_given(ModelParam::Tox));
        assert_eq!(card.options.temp, 350.0);
        assert_eq!(card.options.reltol, SimOptions::default().reltol);
        assert_eq!(card.instance.get("w"), Some(&4e-6));
    }

    #[test]
    fn test_card_defaults() {
        let card = Card::from_json(r#"{ "model": {} }"#).unwrap();
        let model = card.build_model().unwrap();
        assert_eq!(model.polarity(), Polarity::N);
        assert_eq!(model.level(), MosLevel::One);
        assert!(card.instance.is_empty());
    }

    #[test]
    fn test_card_rejects_bad_values() {
        let bad_level = Card::from_json(r#"{ "model": { "level": 4 } }"#).unwrap();
        assert!(bad_level.build_model().is_err());
        let bad_type = Card::from_json(r#"{ "model": { "type": "npn" } }"#).unwrap();
        assert!(bad_type.build_model().is_err());
        let bad_param = Card::from_json(r#"{ "model": { "nonsense": 1.0 } }"#).unwrap();
        assert!(bad_param.build_model().is_err());
        assert!(Card::from_json("{").is_err());
    }

    #[test]
    fn test_bench_solves() {
        let card = Card::from_json(r#"{ "model": { "vto": 0.7, "kp": 2e-5 } }"#).unwrap();
        let bias = Bias {
            vd: 5.0,
            vg: 2.0,
            vs: 0.0,
            vb: 0.0,
        };
        let mut circuit = card.bench(bias).unwrap();
        circuit.operating_point().unwrap();
        let id = circuit
            .query(DEVICE, spicemos_devices::InstanceQuery::Id)
            .unwrap();
        // Saturation: kp/2 (vgs - vto)^2 with W = L.
        assert!((id - 1e-5 * 1.69).abs() < 1e-9, "{id}");
    }
}
