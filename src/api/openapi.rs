use super::{
    error::ErrorBody,
    handlers::{health, provider, sign_in, sign_out, sign_up, user_movies},
};
use utoipa::{
    openapi::{Contact, InfoBuilder, License},
    OpenApi,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        sign_in::sign_in,
        sign_up::sign_up,
        sign_out::sign_out,
        provider::authorize,
        provider::callback,
        user_movies::create,
        user_movies::delete,
    ),
    components(schemas(health::Health, sign_in::SignInRequest, sign_up::SignUpRequest, ErrorBody)),
    tags(
        (name = "health", description = "Liveness and build information"),
        (name = "auth", description = "Sign-in, sign-up and provider logins"),
        (name = "user-movies", description = "Pass-through to the upstream user API"),
    )
)]
struct ApiDoc;

/// `OpenAPI` document for every route the gateway serves.
#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    doc.info = cargo_info();
    doc
}

fn cargo_info() -> utoipa::openapi::Info {
    // Use Cargo.toml metadata instead of the derive defaults.
    let mut info = InfoBuilder::new()
        .title(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .description(optional_str(env!("CARGO_PKG_DESCRIPTION")))
        .build();

    info.contact = cargo_contact();
    info.license = cargo_license();
    info
}

fn cargo_contact() -> Option<Contact> {
    // Cargo authors are `;` separated and may include "Name <email>".
    let primary = env!("CARGO_PKG_AUTHORS").split(';').next().map(str::trim)?;
    let (name, email) = parse_author(primary);
    if name.is_none() && email.is_none() {
        return None;
    }

    let mut contact = Contact::new();
    contact.name = name.map(str::to_string);
    contact.email = email.map(str::to_string);
    Some(contact)
}

fn cargo_license() -> Option<License> {
    let identifier = optional_str(env!("CARGO_PKG_LICENSE"))?;
    let mut license = License::new(identifier);
    license.identifier = Some(identifier.to_string());
    Some(license)
}

fn optional_str(value: &'static str) -> Option<&'static str> {
    present(value)
}

fn present(value: &str) -> Option<&str> {
    Some(value.trim()).filter(|value| !value.is_empty())
}

fn parse_author(author: &str) -> (Option<&str>, Option<&str>) {
    match author.split_once('<') {
        Some((name, email)) => (present(name), present(email.trim_end_matches('>'))),
        None => (present(author), None),
    }
}
