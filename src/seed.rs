use crate::config::Config;
use crate::models::{NewTeacher, NewUser};
use crate::password::hash_password;
use crate::store::Store;

const TEACHERS: &[(&str, &str)] = &[("Margot", "DELAHAYE"), ("Hélène", "THIERCELIN")];

/// Puts the starting data in place: the default teachers when there are none,
/// and the configured administrator, who cannot be created any other way.
pub async fn seed(store: &dyn Store, config: &Config) -> anyhow::Result<()> {
    if store.list_teachers().await?.is_empty() {
        for (first_name, last_name) in TEACHERS {
            let teacher = store
                .insert_teacher(NewTeacher {
                    first_name: first_name.to_string(),
                    last_name: last_name.to_string(),
                })
                .await?;
            log::info!("Seeded teacher {}", teacher.id);
        }
    }

    if let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) {
        let admin = NewUser {
            email: email.clone(),
            first_name: "Admin".to_string(),
            last_name: "Admin".to_string(),
            password_hash: hash_password(password)?,
            admin: true,
        };
        match store.insert_user(admin).await? {
            Some(user) => log::info!("Seeded administrator {}", user.id),
            None => log::debug!("Administrator account already exists"),
        }
    }
    Ok(())
}
