//! Users API Example - CRUD routes over an in-memory store
//!
//! This example demonstrates:
//! - Registering a `CrudHandler` with `register_crud`
//! - Paginated listings driven by the `Pageable` query parameters
//! - Outcome failures answered with the translated error envelope; the
//!   failure message itself is only logged
//! - Application overrides of the built-in messages
//! - Spring Boot Admin endpoints under the context path
//!
//! ## Running
//!
//! ```bash
//! PORT=8080 STAGE=dev cargo run --example users-api
//! ```
//!
//! ## Testing
//!
//! ```bash
//! curl -X POST http://localhost:8080/api/users \
//!   -H "Content-Type: application/json" \
//!   -d '{"name": "Ana", "email": "ana@example.com"}'
//!
//! curl "http://localhost:8080/api/users?pageNumber=1&pageSize=10"
//! curl http://localhost:8080/api/admin/health
//!
//! # Unknown user, answered in the request's language:
//! # {"errors":{"BAD_REQUEST_400":["Usuário não encontrado ou inválido."]}}
//! curl -H "Accept-Language: pt-BR" http://localhost:8080/api/users/999
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

use api_commons::i18n::keys;
use api_commons::prelude::*;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Serialize)]
struct User {
    id: u64,
    name: String,
    email: String,
}

#[derive(Debug, Deserialize)]
struct NewUser {
    name: String,
    email: String,
}

#[derive(Debug, Deserialize)]
struct UserUpdate {
    name: Option<String>,
    email: Option<String>,
}

#[derive(Default)]
struct UserStore {
    next_id: AtomicU64,
    users: RwLock<Vec<User>>,
}

fn parse_id(id: &str) -> Outcome<u64> {
    id.parse::<u64>().into()
}

impl CrudHandler for UserStore {
    type Item = User;
    type Create = NewUser;
    type Update = UserUpdate;

    async fn get_all(&self, pageable: Pageable) -> Outcome<Pageable<User>> {
        let users = self.users.read().await;
        let matching: Vec<User> = match pageable.filter() {
            Some(filter) => users
                .iter()
                .filter(|u| u.name.contains(filter) || u.email.contains(filter))
                .cloned()
                .collect(),
            None => users.clone(),
        };
        paginate(&VecSource::new(matching), pageable).await.into()
    }

    async fn get_one(&self, id: String) -> Outcome<User> {
        let Some(id) = parse_id(&id).get_or_none() else {
            return Outcome::failure(format!("user id {} is not a number", id));
        };
        let users = self.users.read().await;
        match users.iter().find(|u| u.id == id) {
            Some(user) => Outcome::success(user.clone()),
            None => Outcome::failure(format!("user {} not found", id)),
        }
    }

    async fn create(&self, dto: NewUser) -> Outcome<User> {
        if dto.name.trim().is_empty() || !dto.email.contains('@') {
            return Outcome::failure("name is blank or email is invalid");
        }
        let user = User {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            name: dto.name,
            email: dto.email,
        };
        self.users.write().await.push(user.clone());
        info!(user_id = user.id, "user created");
        Outcome::success(user)
    }

    async fn update(&self, id: String, dto: UserUpdate) -> Outcome<User> {
        let Some(id) = parse_id(&id).get_or_none() else {
            return Outcome::failure(format!("user id {} is not a number", id));
        };
        let mut users = self.users.write().await;
        let Some(user) = users.iter_mut().find(|u| u.id == id) else {
            return Outcome::failure(format!("user {} not found", id));
        };
        if let Some(name) = dto.name {
            user.name = name;
        }
        if let Some(email) = dto.email {
            user.email = email;
        }
        Outcome::success(user.clone())
    }

    async fn delete(&self, id: String) -> Outcome<()> {
        let Some(id) = parse_id(&id).get_or_none() else {
            return Outcome::failure(format!("user id {} is not a number", id));
        };
        let mut users = self.users.write().await;
        let before = users.len();
        users.retain(|u| u.id != id);
        if users.len() == before {
            return Outcome::failure(format!("user {} not found", id));
        }
        Outcome::success(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load_for_service("users-api")?;
    init_tracing(&config)?;

    let app = register_crud(Router::new(), "/users/{user-id}", UserStore::default())?;

    let translations = Translations::default()
        .with_entry(Locale::EnUs, keys::BAD_REQUEST, "User not found or invalid.")
        .with_entry(Locale::PtBr, keys::BAD_REQUEST, "Usuário não encontrado ou inválido.");
    let state = AppState::builder()
        .config(config.clone())
        .translations(translations)
        .build();

    let admin_config = config.clone();
    tokio::spawn(async move {
        if let Err(e) = AdminClient::default().register(&admin_config).await {
            warn!("Spring Boot Admin registration failed: {}", e);
        }
    });

    Server::new(config).serve_with_state(app, state).await?;

    Ok(())
}
