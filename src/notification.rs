const APP_NAME: &str = "Folio";

pub fn send(body: impl Into<String>) {
    let body = body.into();
    if let Err(err) = notify_rust::Notification::new()
        .appname(APP_NAME)
        .summary(APP_NAME)
        .body(&body)
        .show()
    {
        tracing::warn!(%body, "system notification failed: {err}");
    }
}
