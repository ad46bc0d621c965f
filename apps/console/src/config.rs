use std::collections::HashMap;
use std::fs;

use shared::domain::Role;

#[derive(Debug)]
pub struct Settings {
    pub api_url: String,
    pub user_id: String,
    pub role: Role,
    pub company_id: Option<String>,
    pub auth_token: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: "http://127.0.0.1:8080".into(),
            user_id: "local-user".into(),
            role: Role::CompanyAdmin,
            company_id: None,
            auth_token: None,
        }
    }
}

pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string("console.toml") {
        if let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(&raw) {
            if let Some(v) = file_cfg.get("api_url") {
                settings.api_url = v.clone();
            }
            if let Some(v) = file_cfg.get("user_id") {
                settings.user_id = v.clone();
            }
            if let Some(v) = file_cfg.get("role") {
                settings.role = parse_role(v);
            }
            if let Some(v) = file_cfg.get("company_id") {
                settings.company_id = Some(v.clone());
            }
            if let Some(v) = file_cfg.get("auth_token") {
                settings.auth_token = Some(v.clone());
            }
        }
    }

    if let Ok(v) = std::env::var("DASH_API_URL") {
        settings.api_url = v;
    }
    if let Ok(v) = std::env::var("DASH_USER_ID") {
        settings.user_id = v;
    }
    if let Ok(v) = std::env::var("DASH_ROLE") {
        settings.role = parse_role(&v);
    }
    if let Ok(v) = std::env::var("DASH_COMPANY_ID") {
        settings.company_id = Some(v);
    }
    if let Ok(v) = std::env::var("DASH_AUTH_TOKEN") {
        settings.auth_token = Some(v);
    }

    settings
}

fn parse_role(raw: &str) -> Role {
    match raw.trim().to_ascii_lowercase().as_str() {
        "department_admin" => Role::DepartmentAdmin,
        "employee" => Role::Employee,
        "freelancer" => Role::Freelancer,
        _ => Role::CompanyAdmin,
    }
}
