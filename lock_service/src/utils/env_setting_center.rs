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

use actix_web::HttpResponse;
use env_config_parse::{find_file, get_env_value};
use log::warn;

const ENV_FILE: &str = ".env.dev";
const SERVER_CONFIG_FILE: &str = "server_config.yaml";

pub async fn default_not_found_page() -> HttpResponse {
    HttpResponse::NotFound().body("Default Custom 404 Page")
}

/// Loads `.env.dev` into the process environment. Variables already set win.
pub fn load_env() {
    let env_file = find_file(ENV_FILE)
        .map(|file| file.to_string_lossy().to_string())
        .unwrap_or_else(|_| format!("./{}", ENV_FILE));
    if let Err(e) = dotenv::from_filename(&env_file) {
        warn!("env file {} not loaded: {}", env_file, e);
    }
}

/// Server config path: `SERVER_CONFIG_PATH`, else the first
/// `server_config.yaml` found under the working directory.
pub fn get_config_path() -> String {
    get_env_value("SERVER_CONFIG_PATH").unwrap_or_else(|| {
        find_file(SERVER_CONFIG_FILE)
            .map(|file| file.to_string_lossy().to_string())
            .unwrap_or_else(|_| format!("./{}", SERVER_CONFIG_FILE))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[actix_web::test]
    async fn test_not_found_page() {
        let resp = default_not_found_page().await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::NOT_FOUND);
        let body = to_bytes(resp.into_body()).await.unwrap();
        assert_eq!(body, "Default Custom 404 Page");
    }
}
