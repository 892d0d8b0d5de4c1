//! Landing page for anonymous visitors.

use axum::response::Html;

const PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="utf-8"><title>Cereal Notes</title></head>
<body>
<nav>
  <button type="button" data-tab="signup-form">Sign up</button>
  <button type="button" data-tab="login-form">Log in</button>
</nav>
<form id="signup-form">
  <input name="displayName" placeholder="Display name" required>
  <input name="emailAddress" type="email" placeholder="Email address" required>
  <input name="password" type="password" placeholder="Password" minlength="8" required>
  <button type="submit">Sign up</button>
</form>
<form id="login-form" hidden>
  <input name="emailAddress" type="email" placeholder="Email address" required>
  <input name="password" type="password" placeholder="Password" required>
  <button type="submit">Log in</button>
</form>
<script>
function showTab(id) {
  for (const form of document.querySelectorAll("form")) {
    form.hidden = form.id !== id;
  }
}

function post(path, form) {
  const body = {};
  for (const [name, value] of new FormData(form)) {
    body[name] = name === "password" ? value : value.trim();
  }
  return fetch(path, {
    method: "POST",
    headers: { "Content-Type": "application/json" },
    body: JSON.stringify(body),
  });
}

for (const button of document.querySelectorAll("[data-tab]")) {
  button.addEventListener("click", () => showTab(button.dataset.tab));
}

document.getElementById("signup-form").addEventListener("submit", async (event) => {
  event.preventDefault();
  const response = await post("/user", event.target);
  if (response.status === 201) {
    showTab("login-form");
    alert("Successfully created user, please sign in");
  } else if (response.status === 409) {
    alert("Email address already in use");
  } else {
    alert("Unknown error");
  }
});

document.getElementById("login-form").addEventListener("submit", async (event) => {
  event.preventDefault();
  const response = await post("/session", event.target);
  if (response.status === 201) {
    location.reload();
  } else {
    alert("Error in logging in");
  }
});
</script>
</body>
</html>
"#;

pub async fn handler() -> Html<&'static str> {
    Html(PAGE)
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use http_body_util::BodyExt;

    use crate::*;

    #[tokio::test]
    async fn test_page_is_public() {
        let (state, _) = router::tests::state();
        let response = make_request(
            app(state),
            Method::GET,
            "/login-or-signup",
            String::default(),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_forms_post_to_account_routes() {
        let (state, _) = router::tests::state();
        let response = make_request(
            app(state),
            Method::GET,
            paths::LOGIN_OR_SIGNUP,
            String::default(),
            None,
        )
        .await;
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let page = std::str::from_utf8(&body).unwrap();

        assert!(page.contains(r#"post("/user""#));
        assert!(page.contains(r#"post("/session""#));
        assert!(page.contains("Email address already in use"));
        assert!(page.contains("location.reload()"));
        assert_eq!(page.matches(r#"type="submit""#).count(), 2);
    }
}
