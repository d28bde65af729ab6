//! Account commands.

use shop_smart_core::{Customer, CustomerUpdate, Email, NewCustomer};
use shop_smart_storefront::StorefrontError;

use super::{App, CommandResult, non_blank};
use crate::ProfileArgs;

fn parse_email(raw: &str) -> Result<Email, StorefrontError> {
    Email::parse(raw).map_err(|e| StorefrontError::InvalidInput(format!("{raw}: {e}")))
}

fn print_customer(customer: &Customer) {
    println!("{} <{}>", customer.display_name(), customer.email);
    if let Some(phone) = &customer.phone_number {
        println!("  Phone:   {phone}");
    }
    let address: Vec<&str> = [
        &customer.address,
        &customer.city,
        &customer.state,
        &customer.postal_code,
        &customer.country,
    ]
    .into_iter()
    .filter_map(|part| part.as_deref())
    .filter(|part| !part.trim().is_empty())
    .collect();
    if !address.is_empty() {
        println!("  Address: {}", address.join(", "));
    }
    println!("  Customer since {}", customer.created_at.format("%Y-%m-%d"));
}

/// `account login <email>`
pub async fn login(app: &App, email: &str) -> CommandResult {
    let customer = app.handle.session()?.login(email).await?;
    println!("Welcome back, {}!", customer.display_name());
    Ok(())
}

/// `account register`
pub async fn register(
    app: &App,
    email: &str,
    first_name: String,
    last_name: String,
    phone: Option<String>,
) -> CommandResult {
    let new = NewCustomer {
        first_name: first_name.trim().to_string(),
        last_name: last_name.trim().to_string(),
        email: parse_email(email)?,
        phone_number: non_blank(phone),
        address: None,
        city: None,
        state: None,
        postal_code: None,
        country: None,
    };
    if new.first_name.is_empty() || new.last_name.is_empty() {
        return Err(StorefrontError::InvalidInput(
            "first and last name are required".to_string(),
        ));
    }

    let customer = app.handle.session()?.register(&new).await?;
    println!("Account created. Welcome, {}!", customer.display_name());
    Ok(())
}

/// `account update`
pub async fn update(app: &App, profile: ProfileArgs) -> CommandResult {
    let update = CustomerUpdate {
        first_name: non_blank(profile.first_name),
        last_name: non_blank(profile.last_name),
        email: non_blank(profile.email)
            .map(|raw| parse_email(&raw))
            .transpose()?,
        phone_number: non_blank(profile.phone),
        address: non_blank(profile.address.address),
        city: non_blank(profile.address.city),
        state: non_blank(profile.address.state),
        postal_code: non_blank(profile.address.postal_code),
        country: non_blank(profile.address.country),
    };
    if update.is_empty() {
        return Err(StorefrontError::InvalidInput(
            "nothing to update".to_string(),
        ));
    }

    let customer = app.handle.session()?.update_profile(&update).await?;
    println!("Profile updated.");
    print_customer(&customer);
    Ok(())
}

/// `account logout`
pub fn logout(app: &App) -> CommandResult {
    let session = app.handle.session()?;
    if session.is_authenticated() {
        session.logout();
        println!("Logged out.");
    } else {
        println!("Not logged in.");
    }
    Ok(())
}

/// `account show`
pub fn show(app: &App) -> CommandResult {
    match app.handle.session()?.customer() {
        Some(customer) => print_customer(&customer),
        None => println!("Not logged in."),
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use shop_smart_storefront::testing::{
        InMemoryDirectory, RecordingOrders, StaticCatalog, customer,
    };
    use shop_smart_storefront::SessionError;

    use super::*;
    use crate::commands::test_support::TestApp;

    fn test_app(customers: Vec<Customer>) -> TestApp {
        TestApp::new(
            InMemoryDirectory::with_customers(customers),
            StaticCatalog::default(),
            RecordingOrders::default(),
        )
    }

    #[tokio::test]
    async fn test_register_update_logout() {
        let t = test_app(Vec::new());

        register(
            &t.app,
            "grace@example.com",
            " Grace ".to_string(),
            "Hopper".to_string(),
            Some("  ".to_string()),
        )
        .await
        .unwrap();
        let session = t.provider.session();
        let registered = session.customer().unwrap();
        assert_eq!(registered.first_name, "Grace");
        assert_eq!(registered.phone_number, None);

        let profile = ProfileArgs {
            phone: Some("555-0100".to_string()),
            ..ProfileArgs::default()
        };
        update(&t.app, profile).await.unwrap();
        assert_eq!(
            session.customer().unwrap().phone_number.as_deref(),
            Some("555-0100")
        );

        show(&t.app).unwrap();
        logout(&t.app).unwrap();
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn test_register_validates_input() {
        let t = test_app(Vec::new());

        let err = register(&t.app, "not-an-email", "A".into(), "B".into(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, StorefrontError::InvalidInput(_)));

        let err = register(&t.app, "a@x.com", " ".into(), "B".into(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, StorefrontError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_update_with_nothing_to_change() {
        let t = test_app(vec![customer(1, "a@x.com")]);
        login(&t.app, "a@x.com").await.unwrap();

        let err = update(&t.app, ProfileArgs::default()).await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid input: nothing to update");
    }

    #[tokio::test]
    async fn test_login_unknown_email() {
        let t = test_app(Vec::new());

        let err = login(&t.app, "nobody@x.com").await.unwrap_err();

        assert!(matches!(
            err,
            StorefrontError::Session(SessionError::CustomerNotFound)
        ));
        assert!(err.is_user_facing());
    }
}
