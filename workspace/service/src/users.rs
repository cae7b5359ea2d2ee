use model::entities::user;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter, Set,
    TransactionTrait,
};
use tracing::{info, instrument};

use crate::auth::TelegramLogin;
use crate::error::{ServiceError, ServiceResult};
use crate::wallets;

/// Finds or creates the user behind a verified Telegram login.
///
/// First login registers the user and provisions their default wallet;
/// later logins refresh the display name. Deactivated users are
/// rejected with a Forbidden error.
#[instrument(skip(db, login), fields(telegram_id = login.id))]
pub async fn register_or_login(
    db: &DatabaseConnection,
    login: &TelegramLogin,
) -> ServiceResult<user::Model> {
    get_or_create_by_telegram(db, login.id, login.display_name()).await
}

/// Shared find-or-create path for the login flow and the bot webhook.
pub async fn get_or_create_by_telegram(
    db: &DatabaseConnection,
    telegram_id: i64,
    display_name: String,
) -> ServiceResult<user::Model> {
    let txn = db.begin().await?;

    let existing = user::Entity::find()
        .filter(user::Column::TelegramId.eq(telegram_id))
        .one(&txn)
        .await?;

    let user = match existing {
        Some(user) if !user.is_active => {
            return Err(ServiceError::Forbidden("user is deactivated".to_string()));
        }
        Some(user) => {
            if user.display_name != display_name {
                let mut active: user::ActiveModel = user.into();
                active.display_name = Set(display_name);
                active.update(&txn).await?
            } else {
                user
            }
        }
        None => {
            let created = user::ActiveModel {
                telegram_id: Set(telegram_id),
                display_name: Set(display_name),
                is_active: Set(true),
                default_wallet_id: Set(None),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
            wallets::ensure_default_wallet_in(&txn, &created).await?;
            info!(user_id = created.id, "registered new user");
            // Re-read to pick up the default wallet pointer.
            user::Entity::find_by_id(created.id)
                .one(&txn)
                .await?
                .ok_or(ServiceError::NotFound("user"))?
        }
    };

    txn.commit().await?;
    Ok(user)
}

/// Loads an active user by id; used by the bearer-token extractor.
pub async fn get_active_user(
    db: &DatabaseConnection,
    user_id: i32,
) -> ServiceResult<user::Model> {
    let user = user::Entity::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or(ServiceError::NotFound("user"))?;
    if !user.is_active {
        return Err(ServiceError::Forbidden("user is deactivated".to_string()));
    }
    Ok(user)
}

/// Finds a user by their Telegram id (bot webhook path).
pub async fn find_by_telegram_id(
    db: &DatabaseConnection,
    telegram_id: i64,
) -> ServiceResult<Option<user::Model>> {
    Ok(user::Entity::find()
        .filter(user::Column::TelegramId.eq(telegram_id))
        .one(db)
        .await?)
}

pub async fn update_display_name(
    db: &DatabaseConnection,
    user: &user::Model,
    display_name: String,
) -> ServiceResult<user::Model> {
    if display_name.trim().is_empty() {
        return Err(ServiceError::validation("display name must not be empty"));
    }
    let mut active: user::ActiveModel = user.clone().into();
    active.display_name = Set(display_name);
    Ok(active.update(db).await?)
}

/// Soft-disables the user; their data stays but authentication fails.
pub async fn deactivate(
    db: &DatabaseConnection,
    user: &user::Model,
) -> ServiceResult<user::Model> {
    let mut active: user::ActiveModel = user.clone().into();
    active.is_active = Set(false);
    Ok(active.update(db).await?)
}

/// Hard-deletes the user; wallets, transactions and debts cascade.
pub async fn delete_user(db: &DatabaseConnection, user: &user::Model) -> ServiceResult<()> {
    user.clone().delete(db).await?;
    Ok(())
}
