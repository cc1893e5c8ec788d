//! 助产士账户

use bidan_core::{collections, fields, BidanError, MidwifeAccount, MidwifeProfile, Result};
use bidan_database::{DocumentStore, Filter};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

use crate::password;
use crate::to_document;

const SUPERADMIN_ROLE: &str = "superadmin";

/// 注册请求
#[derive(Debug, Clone, Deserialize)]
pub struct MidwifeRegistration {
    pub username: String,
    pub full_name: String,
    #[serde(default)]
    pub phone_number: String,
    pub password: String,
}

/// 登录请求
#[derive(Debug, Clone, Deserialize)]
pub struct MidwifeLogin {
    pub username: String,
    pub password: String,
}

#[derive(Clone)]
pub struct MidwifeService {
    store: Arc<dyn DocumentStore>,
}

fn decode_account(document: bidan_database::Document) -> Result<MidwifeAccount> {
    Ok(serde_json::from_value(Value::Object(document))?)
}

impl MidwifeService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn register(&self, request: MidwifeRegistration) -> Result<MidwifeProfile> {
        let username = request.username.trim();
        if username.is_empty() {
            return Err(BidanError::required("username"));
        }
        if request.full_name.trim().is_empty() {
            return Err(BidanError::required("full_name"));
        }
        password::validate_policy(&request.password)?;

        let mut account = MidwifeAccount {
            id: None,
            username: username.to_string(),
            full_name: request.full_name.trim().to_string(),
            phone_number: request.phone_number,
            role: "bidan".to_string(),
            password: password::hash_password(&request.password)?,
        };
        let id = self
            .store
            .insert_unique(collections::MIDWIVES, "username", to_document(&account)?)
            .await?
            .ok_or_else(|| BidanError::validation("username", "already exists"))?;
        account.id = Some(id);

        info!("Registered midwife account {}", account.username);
        Ok(account.into())
    }

    /// 校验凭据; 用户不存在与密码错误返回同一错误
    pub async fn login(&self, request: MidwifeLogin) -> Result<MidwifeProfile> {
        let invalid = || BidanError::validation("credentials", "are invalid");

        let document = self
            .store
            .find_one(collections::MIDWIVES, &Filter::eq("username", request.username.trim()))
            .await?
            .ok_or_else(invalid)?;
        let account = decode_account(document)?;

        if !password::verify_password(&request.password, &account.password) {
            warn!("Failed login attempt for {}", account.username);
            return Err(invalid());
        }

        info!("Midwife {} logged in", account.username);
        Ok(account.into())
    }

    /// 列出非超级管理员账户, 可按姓名过滤
    pub async fn list(&self, keyword: Option<&str>) -> Result<Vec<MidwifeProfile>> {
        let mut conditions = vec![Filter::ne("role", SUPERADMIN_ROLE)];
        if let Some(keyword) = keyword.map(str::trim).filter(|k| !k.is_empty()) {
            conditions.push(Filter::contains_text("full_name", keyword));
        }

        let documents = self
            .store
            .find(collections::MIDWIVES, &Filter::and(conditions))
            .await?;
        documents
            .into_iter()
            .map(|doc| decode_account(doc).map(MidwifeProfile::from))
            .collect()
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        let deleted = self
            .store
            .delete_one(collections::MIDWIVES, &Filter::eq(fields::DOCUMENT_ID, id))
            .await?;
        if deleted == 0 {
            return Err(BidanError::NotFound(format!("midwife {}", id)));
        }
        info!("Deleted midwife account {}", id);
        Ok(())
    }
}
