//! Application state: configuration plus the weather, advice and account services.

use ecogarden_accounts::{AccountError, NewUser, Role, SqliteUserStore, User, UserUpdate};
use ecogarden_advice::{
    seed_fixtures, Advice, AdviceError, AdviceUpdate, Month, NewAdvice, SqliteAdviceStore,
};
use ecogarden_core::{AppError, Config};
use ecogarden_weather::{normalize_city, WeatherLookupCache, WeatherSnapshot};
use serde::Serialize;

/// Weather response shape exposed to clients.
#[derive(Debug, Clone, Serialize)]
pub struct WeatherReport {
    pub message: String,
    pub meteo: WeatherSnapshot,
}

pub struct App {
    config: Config,
    weather: WeatherLookupCache,
    advice: SqliteAdviceStore,
    users: SqliteUserStore,
}

impl App {
    /// Open the database and build the weather lookup described by `config`.
    pub fn new(config: Config) -> Result<Self, AppError> {
        let db_path = config.database_path();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let weather = WeatherLookupCache::from_config(&config.weather)?;
        let advice = SqliteAdviceStore::new(&db_path)?;
        let users = SqliteUserStore::new(&db_path)?;

        tracing::info!("Using database {}", db_path.display());
        Ok(Self {
            config,
            weather,
            advice,
            users,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Load default advice and accounts into empty tables.
    pub fn seed(&self) -> Result<(usize, usize), AppError> {
        let advice = seed_fixtures(&self.advice)?;
        let users = self.users.seed_fixtures()?;
        Ok((advice, users))
    }

    /// Resolve the caller from its credentials. Wrong or unknown credentials are a 401.
    pub fn authenticate(&self, email: &str, password: &str) -> Result<User, AppError> {
        let user = self
            .users
            .verify_credentials(email, password)?
            .ok_or(AccountError::InvalidCredentials)?;
        tracing::debug!("Authenticated user {}", user.id);
        Ok(user)
    }

    pub async fn weather_for_city(
        &self,
        caller: &User,
        city: &str,
    ) -> Result<WeatherReport, AppError> {
        caller.require_role(Role::User)?;
        let meteo = self.weather.get(city).await?;
        Ok(WeatherReport {
            message: format!("Météo pour {}", normalize_city(city).unwrap_or_default()),
            meteo,
        })
    }

    /// Weather for the caller's home city.
    pub async fn weather_for_caller(&self, caller: &User) -> Result<WeatherReport, AppError> {
        self.weather_for_city(caller, &caller.city).await
    }

    /// Advice for `month`, or the current month when `None`.
    ///
    /// An empty result is reported as `NoAdviceForMonth`.
    pub fn advice_for_month(
        &self,
        caller: &User,
        month: Option<i64>,
    ) -> Result<Vec<Advice>, AppError> {
        caller.require_role(Role::User)?;
        let month = match month {
            Some(m) => Month::new(m)?,
            None => Month::current(),
        };
        let advice = self.advice.find_by_month(month)?;
        if advice.is_empty() {
            return Err(AdviceError::NoAdviceForMonth(month).into());
        }
        Ok(advice)
    }

    pub fn list_advice(&self, caller: &User) -> Result<Vec<Advice>, AppError> {
        caller.require_role(Role::User)?;
        Ok(self.advice.list()?)
    }

    pub fn add_advice(&self, caller: &User, input: &NewAdvice) -> Result<Advice, AppError> {
        caller.require_role(Role::Admin)?;
        Ok(self.advice.create(input)?)
    }

    pub fn update_advice(
        &self,
        caller: &User,
        id: i64,
        input: &AdviceUpdate,
    ) -> Result<Advice, AppError> {
        caller.require_role(Role::Admin)?;
        Ok(self.advice.update(id, input)?)
    }

    pub fn delete_advice(&self, caller: &User, id: i64) -> Result<(), AppError> {
        caller.require_role(Role::Admin)?;
        Ok(self.advice.delete(id)?)
    }

    /// Open registration; no caller needed.
    pub fn register_user(&self, input: &NewUser) -> Result<User, AppError> {
        Ok(self.users.register(input)?)
    }

    pub fn update_user(
        &self,
        caller: &User,
        id: i64,
        changes: &UserUpdate,
    ) -> Result<User, AppError> {
        caller.require_role(Role::Admin)?;
        Ok(self.users.update(id, changes)?)
    }

    pub fn delete_user(&self, caller: &User, id: i64) -> Result<(), AppError> {
        caller.require_role(Role::Admin)?;
        Ok(self.users.delete(id)?)
    }
}
