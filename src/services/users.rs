use crate::{
    auth::{hash_password, verify_password, PasswordPolicy, DUMMY_PASSWORD_HASH},
    db::{self, DbPool, SearchBuilder},
    entities::user::{self, Entity as UserEntity, UserProfile, UserRole, UserStatus},
    errors::{DbResultExt, ServiceError},
    events::{Event, EventSender},
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QueryTrait, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument, warn};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// Self-service registration
#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 255, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
    pub password: String,
    /// Defaults to Farmer. Admin accounts are created by administrators.
    pub role: Option<UserRole>,
}

/// Admin-side user creation
#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateUserRequest {
    #[validate(length(min = 1, max = 255, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
    pub password: String,
    pub role: UserRole,
    pub status: Option<UserStatus>,
}

#[derive(Debug, Default, Serialize, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, max = 255, message = "Name must not be empty"))]
    pub name: Option<String>,
    #[validate(email(message = "A valid email is required"))]
    pub email: Option<String>,
    pub role: Option<UserRole>,
    pub status: Option<UserStatus>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateUserStatusRequest {
    pub status: UserStatus,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UserFilters {
    /// Case-insensitive match on name or email
    pub search: Option<String>,
    pub role: Option<UserRole>,
    pub status: Option<UserStatus>,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Accounts, registration and credential checks
#[derive(Clone)]
pub struct UserService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
    password_policy: PasswordPolicy,
}

impl UserService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
            password_policy: PasswordPolicy::default(),
        }
    }

    #[instrument(skip(self))]
    pub async fn list(&self, filters: &UserFilters) -> Result<Vec<UserProfile>, ServiceError> {
        let search = SearchBuilder::new(filters.search.as_deref())
            .add_like(user::Column::Name)
            .add_like(user::Column::Email)
            .build();

        let users = UserEntity::find()
            .apply_if(search, QueryFilter::filter)
            .apply_if(filters.role, |q, role| q.filter(user::Column::Role.eq(role)))
            .apply_if(filters.status, |q, status| {
                q.filter(user::Column::Status.eq(status))
            })
            .order_by_asc(user::Column::Id)
            .all(&*self.db_pool)
            .await
            .or_db_error("list_users")?;

        Ok(users.into_iter().map(UserProfile::from).collect())
    }

    #[instrument(skip(self))]
    pub async fn get_by_id(&self, id: i32) -> Result<Option<UserProfile>, ServiceError> {
        let user = UserEntity::find_by_id(id)
            .one(&*self.db_pool)
            .await
            .or_db_error("get_user")?;
        Ok(user.map(UserProfile::from))
    }

    /// Registers a new account. Self-registration cannot grant the Admin role.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn register(&self, request: RegisterRequest) -> Result<UserProfile, ServiceError> {
        request.validate()?;
        let role = request.role.unwrap_or(UserRole::Farmer);
        if role == UserRole::Admin {
            return Err(ServiceError::Forbidden(
                "Admin accounts can only be created by an administrator".to_string(),
            ));
        }

        self.insert_user(
            request.name,
            request.email,
            request.password,
            role,
            UserStatus::Active,
        )
        .await
    }

    #[instrument(skip(self, request), fields(email = %request.email, role = %request.role))]
    pub async fn create(&self, request: CreateUserRequest) -> Result<UserProfile, ServiceError> {
        request.validate()?;
        self.insert_user(
            request.name,
            request.email,
            request.password,
            request.role,
            request.status.unwrap_or(UserStatus::Active),
        )
        .await
    }

    async fn insert_user(
        &self,
        name: String,
        email: String,
        password: String,
        role: UserRole,
        status: UserStatus,
    ) -> Result<UserProfile, ServiceError> {
        self.password_policy.check(&password)?;
        let email = normalize_email(&email);
        let password_hash = hash_password(&password)?;

        let db = &*self.db_pool;
        let existing = UserEntity::find()
            .filter(user::Column::Email.eq(email.as_str()))
            .one(db)
            .await
            .or_db_error("find_user_by_email")?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(format!(
                "A user with email {email} already exists"
            )));
        }

        let created = user::ActiveModel {
            name: Set(name.trim().to_string()),
            email: Set(email),
            password_hash: Set(password_hash),
            role: Set(role),
            status: Set(status),
            last_active: Set(None),
            date_joined: Set(Utc::now()),
            ..Default::default()
        }
        .insert(db)
        .await
        .or_db_error("create_user")?;

        info!(user_id = created.id, role = %created.role, "User created");
        super::publish(&self.event_sender, Event::UserRegistered(created.id)).await;

        Ok(created.into())
    }

    #[instrument(skip(self, request))]
    pub async fn update(
        &self,
        id: i32,
        request: UpdateUserRequest,
    ) -> Result<UserProfile, ServiceError> {
        request.validate()?;
        let db = &*self.db_pool;
        let started = Instant::now();
        let txn = db::begin(db, "update_user").await?;

        let existing = UserEntity::find_by_id(id)
            .one(&txn)
            .await
            .or_db_error("update_user")?
            .ok_or_else(|| ServiceError::NotFound(format!("User {id} not found")))?;

        let mut active: user::ActiveModel = existing.into();
        if let Some(name) = request.name {
            active.name = Set(name.trim().to_string());
        }
        if let Some(email) = request.email {
            let email = normalize_email(&email);
            let taken = UserEntity::find()
                .filter(user::Column::Email.eq(email.as_str()))
                .filter(user::Column::Id.ne(id))
                .one(&txn)
                .await
                .or_db_error("update_user")?;
            if taken.is_some() {
                return Err(ServiceError::Conflict(format!(
                    "A user with email {email} already exists"
                )));
            }
            active.email = Set(email);
        }
        if let Some(role) = request.role {
            active.role = Set(role);
        }
        if let Some(status) = request.status {
            active.status = Set(status);
        }
        if let Some(password) = request.password {
            self.password_policy.check(&password)?;
            active.password_hash = Set(hash_password(&password)?);
        }

        let updated = active.update(&txn).await.or_db_error("update_user")?;
        db::commit(txn, "update_user", started).await?;

        info!(user_id = id, "User updated");
        super::publish(&self.event_sender, Event::UserUpdated(id)).await;
        Ok(updated.into())
    }

    #[instrument(skip(self))]
    pub async fn set_status(&self, id: i32, status: UserStatus) -> Result<UserProfile, ServiceError> {
        self.update(
            id,
            UpdateUserRequest {
                status: Some(status),
                ..Default::default()
            },
        )
        .await
    }

    /// Returns false when the user did not exist.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: i32) -> Result<bool, ServiceError> {
        let result = UserEntity::delete_by_id(id)
            .exec(&*self.db_pool)
            .await
            .or_db_error("delete_user")?;
        if result.rows_affected == 0 {
            return Ok(false);
        }
        info!(user_id = id, "User deleted");
        super::publish(&self.event_sender, Event::UserDeleted(id)).await;
        Ok(true)
    }

    /// Checks credentials and stamps `last_active`. Unknown email and wrong
    /// password produce the same error.
    #[instrument(skip(self, password))]
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<user::Model, ServiceError> {
        let db = &*self.db_pool;
        let email = normalize_email(email);

        let Some(user) = UserEntity::find()
            .filter(user::Column::Email.eq(email.as_str()))
            .one(db)
            .await
            .or_db_error("authenticate")?
        else {
            // Same argon2 cost as a wrong password; the outcome is always a rejection.
            verify_password(password, DUMMY_PASSWORD_HASH).ok();
            warn!("Login attempt for unknown email");
            return Err(ServiceError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        };

        if !verify_password(password, &user.password_hash)? {
            warn!(user_id = user.id, "Login attempt with wrong password");
            return Err(ServiceError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }

        if user.status == UserStatus::Inactive {
            return Err(ServiceError::Forbidden("Account is inactive".to_string()));
        }

        let mut active: user::ActiveModel = user.into();
        active.last_active = Set(Some(Utc::now()));
        let user = active.update(db).await.or_db_error("authenticate")?;

        info!(user_id = user.id, "User logged in");
        Ok(user)
    }
}
