/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::net::IpAddr;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, anyhow};
use humanize_rs::ParseError;
use yaml_rust::{Yaml, yaml};

use super::{MetricsConfig, PrometheusConfig};

fn normalize_key(k: &str) -> String {
    k.to_lowercase().replace('-', "_")
}

fn foreach_kv<F>(table: &yaml::Hash, mut f: F) -> anyhow::Result<()>
where
    F: FnMut(&str, &Yaml) -> anyhow::Result<()>,
{
    for (k, v) in table.iter() {
        if let Yaml::String(key) = k {
            f(key, v).context(format!("failed to parse value of key {key}"))?;
        } else {
            return Err(anyhow!("key in hash should be string"));
        }
    }
    Ok(())
}

fn as_string(v: &Yaml) -> anyhow::Result<String> {
    match v {
        Yaml::String(s) => Ok(s.to_string()),
        Yaml::Integer(i) => Ok(i.to_string()),
        Yaml::Real(s) => Ok(s.to_string()),
        _ => Err(anyhow!(
            "yaml value type for string should be 'string' / 'integer' / 'real'"
        )),
    }
}

fn as_f64(v: &Yaml) -> anyhow::Result<f64> {
    match v {
        Yaml::Integer(i) => Ok(*i as f64),
        Yaml::Real(s) | Yaml::String(s) => {
            f64::from_str(s).map_err(|e| anyhow!("invalid f64 value {s}: {e}"))
        }
        _ => Err(anyhow!(
            "yaml value type for f64 should be 'integer' / 'real' / 'string'"
        )),
    }
}

fn as_ipaddr(v: &Yaml) -> anyhow::Result<IpAddr> {
    if let Yaml::String(s) = v {
        IpAddr::from_str(s).map_err(|e| anyhow!("invalid ip address {s}: {e}"))
    } else {
        Err(anyhow!("yaml value type for 'IpAddr' should be 'string'"))
    }
}

fn as_duration(v: &Yaml) -> anyhow::Result<Duration> {
    match v {
        Yaml::String(value) => match humanize_rs::duration::parse(value) {
            Ok(v) => Ok(v),
            Err(ParseError::MissingUnit) => {
                if let Ok(u) = u64::from_str(value) {
                    Ok(Duration::from_secs(u))
                } else if let Ok(f) = f64::from_str(value) {
                    Duration::try_from_secs_f64(f).map_err(anyhow::Error::new)
                } else {
                    Err(anyhow!("invalid duration string"))
                }
            }
            Err(e) => Err(anyhow!("invalid humanize duration string: {e}")),
        },
        Yaml::Integer(value) => {
            if let Ok(u) = u64::try_from(*value) {
                Ok(Duration::from_secs(u))
            } else {
                Err(anyhow!("unsupported duration value"))
            }
        }
        Yaml::Real(s) => {
            let f = f64::from_str(s).map_err(|e| anyhow!("invalid f64 value: {e}"))?;
            Duration::try_from_secs_f64(f).map_err(anyhow::Error::new)
        }
        _ => Err(anyhow!(
            "yaml value type for humanize duration should be 'string' or 'integer' or 'real'"
        )),
    }
}

/// A comma separated string, or a sequence of strings.
fn as_target_list(v: &Yaml) -> anyhow::Result<String> {
    match v {
        Yaml::String(s) => Ok(s.to_string()),
        Yaml::Array(seq) => {
            let mut names = Vec::with_capacity(seq.len());
            for (i, v) in seq.iter().enumerate() {
                let name = as_string(v).context(format!("invalid backend name value for #{i}"))?;
                names.push(name);
            }
            Ok(names.join(","))
        }
        _ => Err(anyhow!(
            "yaml value type for 'target' should be 'string' or 'array'"
        )),
    }
}

impl PrometheusConfig {
    pub fn parse_yaml(v: &Yaml) -> anyhow::Result<Self> {
        if let Yaml::Hash(map) = v {
            let mut config = PrometheusConfig::default();
            foreach_kv(map, |k, v| config.set_by_yaml_kv(k, v))?;
            Ok(config)
        } else {
            Err(anyhow!(
                "yaml value type for 'prometheus config' should be 'map'"
            ))
        }
    }

    fn set_by_yaml_kv(&mut self, k: &str, v: &Yaml) -> anyhow::Result<()> {
        match normalize_key(k).as_str() {
            "subsystem" => {
                self.subsystem = as_string(v).context(format!("invalid string value for key {k}"))?;
                Ok(())
            }
            "buckets" => {
                let Yaml::Array(seq) = v else {
                    return Err(anyhow!("invalid array value for key {k}"));
                };
                let mut buckets = Vec::with_capacity(seq.len());
                for (i, v) in seq.iter().enumerate() {
                    let b = as_f64(v).context(format!("invalid bucket value for #{i}"))?;
                    buckets.push(b);
                }
                self.buckets = buckets;
                Ok(())
            }
            _ => Err(anyhow!("invalid key {k}")),
        }
    }
}

impl MetricsConfig {
    pub fn parse_yaml(v: &Yaml) -> anyhow::Result<Self> {
        if let Yaml::Hash(map) = v {
            let mut config = MetricsConfig::default();
            foreach_kv(map, |k, v| config.set_by_yaml_kv(k, v))?;
            Ok(config)
        } else {
            Err(anyhow!("yaml value type for 'metrics config' should be 'map'"))
        }
    }

    fn set_by_yaml_kv(&mut self, k: &str, v: &Yaml) -> anyhow::Result<()> {
        match normalize_key(k).as_str() {
            "target" => {
                self.target = as_target_list(v).context(format!("invalid value for key {k}"))?;
                Ok(())
            }
            "prefix" => {
                self.prefix = as_string(v).context(format!("invalid string value for key {k}"))?;
                Ok(())
            }
            "names" => {
                self.names = as_string(v).context(format!("invalid string value for key {k}"))?;
                Ok(())
            }
            "statsd" | "statsd_addr" => {
                self.statsd_addr =
                    as_string(v).context(format!("invalid string value for key {k}"))?;
                Ok(())
            }
            "statsd_bind" => {
                let ip = as_ipaddr(v).context(format!("invalid ip address value for key {k}"))?;
                self.statsd_bind = Some(ip);
                Ok(())
            }
            "interval" | "emit_interval" => {
                self.interval =
                    as_duration(v).context(format!("invalid humanize duration value for key {k}"))?;
                Ok(())
            }
            "prometheus" => {
                self.prometheus = PrometheusConfig::parse_yaml(v)
                    .context(format!("invalid prometheus config value for key {k}"))?;
                Ok(())
            }
            _ => Err(anyhow!("invalid key {k}")),
        }
    }
}
