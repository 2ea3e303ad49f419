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

use crate::controllers::lock_controller;
use actix_web::web;

/// configure routes
pub fn configure_lock_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/lock")
            .route("/trylock", web::get().to(lock_controller::try_lock))
            .route("/trylock", web::post().to(lock_controller::try_lock))
            .route("/lockTime", web::get().to(lock_controller::lock_time)),
    );
}
