/*
 * Copyright (c) Huawei Technologies Co., Ltd. 2025. All rights reserved.
 * Global Trust Authority is licensed under the Mulan PSL v2.
 * You can use this software according to the terms and conditions of the Mulan PSL v2.
 * You may obtain a copy of Mulan PSL v2 at:
 *     http://license.coscl.org.cn/MulanPSL2
 * THIS SOFTWARE IS PROVIDED ON AN "AS IS" BASIS, WITHOUT WARRANTIES OF ANY KIND, EITHER EXPRESS OR
 * IMPLIED, INCLUDING BUT NOT LIMITED TO NON-INFRINGEMENT, MERCHANTABILITY OR FIT FOR A PARTICULAR
 * PURPOSE.
 * See the Mulan PSL v2 for more details.
 */

mod controllers;
mod middlewares;
mod routes;
mod services;
mod utils;

use std::io::{Error, ErrorKind};
use std::sync::Arc;
use actix_web::{middleware, web, App, HttpServer};
use config_manager::types::context::CONFIG;
use distributed_lock::LockManager;
use log::{info, warn};
use crate::middlewares::lease_store::create_lease_store;
use crate::routes::routes::configure_lock_routes;
use crate::services::lock_demo_service::LockDemoService;
use crate::utils::env_setting_center::{default_not_found_page, get_config_path, load_env};

fn startup_error(message: String) -> Error {
    Error::new(ErrorKind::Other, message)
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    println!("Program started!");
    load_env();
    if let Err(e) = common_log::init_auto() {
        eprintln!("Failed to initialize logger: {}", e);
    }

    let config_path = get_config_path();
    CONFIG.initialize(&config_path).map_err(startup_error)?;
    let config = CONFIG.get_instance().map_err(startup_error)?.lock_service.clone();
    info!("Loaded server config from {}", config_path);

    let store = create_lease_store(&config.store).map_err(startup_error)?;
    let manager = LockManager::new(store, config.lock.clone()).map_err(|e| startup_error(e.to_string()))?;
    if manager.config().acquire_timeout().is_none() {
        warn!("No acquire timeout configured, lock requests wait until the lock is free");
    }
    let service = web::Data::new(LockDemoService::new(Arc::new(manager), config.demo.clone()));

    info!("Lock service listening on {}", config.address);
    HttpServer::new(move || {
        App::new()
            .app_data(service.clone())
            .wrap(middleware::Logger::default())
            .configure(configure_lock_routes)
            .default_service(web::route().to(default_not_found_page))
    })
    .workers(config.workers)
    .bind(&config.address)?
    .run()
    .await
}
