/// GET / liveness probe.
pub async fn index() -> &'static str {
    "Sonar PR context service is running!"
}
