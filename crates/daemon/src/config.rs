// Copyright (C) 2025 Launchpad Contributors
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! The daemon's view of configuration: the library's scheduling knobs plus the handful of
//! things only a running process needs (where to listen for offers, which apps to
//! pre-register on boot). Loaded by layering, in order: built-in defaults, an optional
//! YAML/JSON file, then CLI flags -- the same merge-defaults-then-override shape
//! `moor-mcp-host`'s `main.rs` uses via `figment`.

use std::collections::BTreeMap;

use figment::providers::{Format, Json, Serialized, Yaml};
use figment::Figment;
use launchpad_common::model::{App, Constraint, VersionInfo};
use launchpad_kernel::config::Config as SchedulerConfig;
use serde::{Deserialize, Serialize};

use crate::args::Args;

/// An app to register at startup, in lieu of the (out-of-scope) REST admin API.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppSeed {
    pub id: String,
    pub instances: u32,
    #[serde(default)]
    pub definition: BTreeMap<String, String>,
    #[serde(default)]
    pub constraints: Vec<Constraint>,
}

impl AppSeed {
    pub fn into_app(self) -> App {
        App {
            id: self.id,
            instances: self.instances,
            version: 1,
            version_info: VersionInfo::default(),
            constraints: self.constraints,
            definition: self.definition,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DaemonConfig {
    #[serde(flatten)]
    pub scheduler: SchedulerConfig,
    pub apps: Vec<AppSeed>,
}

impl DaemonConfig {
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let mut figment = Figment::new().merge(Serialized::defaults(DaemonConfig::default()));

        if let Some(path) = &args.config_file {
            figment = match path.extension().and_then(|e| e.to_str()) {
                Some("json") => figment.merge(Json::file(path)),
                _ => figment.merge(Yaml::file(path)),
            };
        }

        let mut config: DaemonConfig = figment.extract()?;

        if let Some(dir) = &args.data_dir {
            config.scheduler.task_store_data_dir = Some(dir.clone());
        }
        if let Some(backend) = &args.task_store_backend {
            config.scheduler.task_store_backend = match backend.as_str() {
                "fjall" => launchpad_kernel::TaskStoreBackend::Fjall,
                _ => launchpad_kernel::TaskStoreBackend::Memory,
            };
        }

        Ok(config)
    }
}
