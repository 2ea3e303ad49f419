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

use actix_web::error::BlockingError;
use actix_web::{web, HttpResponse};
use distributed_lock::Result;
use log::{error, info};
use serde::Deserialize;
use crate::services::lock_demo_service::LockDemoService;

const ANONYMOUS_TASK: &str = "anonymous";

/// lock demo request parameter
#[derive(Debug, Deserialize)]
pub struct TaskQuery {
    #[serde(rename = "taskName")]
    task_name: Option<String>,
    time: Option<u32>,
}

impl TaskQuery {
    fn task_name(&self) -> String {
        self.task_name
            .clone()
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| ANONYMOUS_TASK.to_string())
    }
}

/// Runs the watchdog demo task. Answers `true` when the whole task ran under
/// the lock.
pub async fn try_lock(service: web::Data<LockDemoService>, query: web::Query<TaskQuery>) -> HttpResponse {
    let task_name = query.task_name();
    info!("Receive trylock request from {}", task_name);
    let service = service.into_inner();
    let name = task_name.clone();
    let result = web::block(move || service.run_watchdog_task(&name)).await;
    HttpResponse::Ok().json(task_succeeded(&task_name, result))
}

/// Runs the fixed lease demo task for `time` seconds.
pub async fn lock_time(service: web::Data<LockDemoService>, query: web::Query<TaskQuery>) -> HttpResponse {
    let task_name = query.task_name();
    let ticks = query.time.unwrap_or(0);
    info!("Receive lockTime request from {}, time {}s", task_name, ticks);
    let service = service.into_inner();
    let name = task_name.clone();
    let result = web::block(move || service.run_fixed_lease_task(&name, ticks)).await;
    HttpResponse::Ok().json(task_succeeded(&task_name, result))
}

fn task_succeeded(task_name: &str, result: std::result::Result<Result<()>, BlockingError>) -> bool {
    match result {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            error!("{} failed: {}", task_name, e);
            false
        }
        Err(e) => {
            error!("{} was not run: {}", task_name, e);
            false
        }
    }
}
