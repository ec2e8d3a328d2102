//! Well-known process store entries.

use std::sync::Arc;

use silo_core::{DateTimeProvider, Key, LoggerFactory, ServiceContainer};

use crate::config::AppConfig;

pub const APPLICATION_NAME: Key<String> = Key::new("silo.application_name");
pub const DATE_TIME_PROVIDER: Key<Arc<dyn DateTimeProvider>> = Key::new("silo.date_time_provider");
pub const LOGGER_FACTORY: Key<Arc<dyn LoggerFactory>> = Key::new("silo.logger_factory");
pub const CONFIGURATION: Key<AppConfig> = Key::new("silo.configuration");
pub const SERVICE_PROVIDER: Key<ServiceContainer> = Key::new("silo.service_provider");
