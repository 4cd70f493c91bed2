use std::collections::HashMap;

pub(crate) const SERVICE_NAME: &str = "facetask";

async fn open() -> Result<oo7::Keyring, String> {
    oo7::Keyring::new()
        .await
        .map_err(|e| format!("Failed to connect to keyring: {}", e))
}

/// Store a secret for `server` in the system keyring, replacing any
/// existing one.
pub async fn store_secret(server: &str, label: &str, secret: &str) -> Result<(), String> {
    let keyring = open().await?;

    let mut attrs = HashMap::new();
    attrs.insert("service", SERVICE_NAME);
    attrs.insert("server", server);

    keyring
        .create_item(label, &attrs, secret.as_bytes(), true)
        .await
        .map_err(|e| format!("Failed to store secret: {}", e))?;

    Ok(())
}

/// Load the secret stored for `server`, if any.
pub async fn load_secret(server: &str) -> Result<Option<String>, String> {
    let keyring = open().await?;

    let mut attrs = HashMap::new();
    attrs.insert("service", SERVICE_NAME);
    attrs.insert("server", server);

    let items = keyring
        .search_items(&attrs)
        .await
        .map_err(|e| format!("Failed to search keyring: {}", e))?;

    let Some(item) = items.first() else {
        return Ok(None);
    };
    let secret_bytes = item
        .secret()
        .await
        .map_err(|e| format!("Failed to read secret: {}", e))?;
    let secret = String::from_utf8(secret_bytes.to_vec())
        .map_err(|e| format!("Invalid UTF-8 in secret: {}", e))?;
    Ok(Some(secret))
}

/// Delete every secret stored for `server`.
pub async fn delete_secret(server: &str) -> Result<(), String> {
    let keyring = open().await?;

    let mut attrs = HashMap::new();
    attrs.insert("service", SERVICE_NAME);
    attrs.insert("server", server);

    let items = keyring
        .search_items(&attrs)
        .await
        .map_err(|e| format!("Failed to search keyring: {}", e))?;

    for item in items {
        item.delete()
            .await
            .map_err(|e| format!("Failed to delete secret: {}", e))?;
    }

    Ok(())
}
