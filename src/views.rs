//! HTML rendering.
//!
//! Pages are assembled with `format!` around one shared layout. Every value
//! that originates from a user or the store goes through [`escape`].

use std::fmt::Write;

use axum::response::Html;
use time::OffsetDateTime;

use crate::db::notes::Note;
use crate::db::users::User;
use crate::forms::{LoginForm, NoteForm, SignupForm, Validator};
use crate::middleware::auth::AuthContext;
use crate::middleware::csrf::CSRF_FORM_FIELD;
use crate::services::session::{CSRF_TOKEN_KEY, FLASH_KEY, Session};

const MONTHS: [&str; 12] = ["Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec"];

/// Data every page needs. Building it consumes the pending flash message.
#[derive(Debug, Clone, Default)]
pub struct TemplateData {
    pub current_year: i32,
    pub flash: Option<String>,
    pub is_authenticated: bool,
    pub csrf_token: String,
}

impl TemplateData {
    #[must_use]
    pub fn new(session: &Session, auth: AuthContext) -> Self {
        Self {
            current_year: OffsetDateTime::now_utc().year(),
            flash: session.pop_string(FLASH_KEY),
            is_authenticated: auth.is_authenticated(),
            csrf_token: session.get_string(CSRF_TOKEN_KEY).unwrap_or_default(),
        }
    }

    fn csrf_input(&self) -> String {
        format!(r#"<input type="hidden" name="{CSRF_FORM_FIELD}" value="{}">"#, escape(&self.csrf_token))
    }
}

/// `17 Mar, 2022`, in the timestamp's own offset.
#[must_use]
pub fn fmt_date(t: OffsetDateTime) -> String {
    let month = MONTHS[usize::from(u8::from(t.month())) - 1];
    format!("{:02} {month}, {}", t.day(), t.year())
}

#[must_use]
pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(data: &TemplateData, title: &str, main: &str) -> Html<String> {
    let nav = if data.is_authenticated {
        format!(
            r#"<a href="/note/create">Create note</a>
<a href="/account/view">Account</a>
<form action="/user/logout" method="POST">{}<button>Logout</button></form>"#,
            data.csrf_input()
        )
    } else {
        r#"<a href="/user/signup">Signup</a>
<a href="/user/login">Login</a>"#
            .to_owned()
    };
    let flash = data
        .flash
        .as_deref()
        .map(|f| format!(r#"<div class="flash">{}</div>"#, escape(f)))
        .unwrap_or_default();

    Html(format!(
        r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{title} - Notebox</title>
<link rel="stylesheet" href="/static/css/main.css">
</head>
<body>
<header><h1><a href="/">Notebox</a></h1></header>
<nav>
<a href="/">Home</a>
<a href="/about">About</a>
{nav}
</nav>
<main>
{flash}
{main}
</main>
<footer>Powered by Rust in {year}</footer>
</body>
</html>
"#,
        year = data.current_year,
    ))
}

fn field_error(v: &Validator, field: &str) -> String {
    v.field_error(field)
        .map(|e| format!(r#"<label class="error">{}</label>"#, escape(e)))
        .unwrap_or_default()
}

fn non_field_errors(v: &Validator) -> String {
    v.non_field_errors.iter().fold(String::new(), |mut out, e| {
        let _ = write!(out, r#"<div class="error">{}</div>"#, escape(e));
        out
    })
}

// =============================================================================
// Pages
// =============================================================================

#[must_use]
pub fn home(data: &TemplateData, notes: &[Note]) -> Html<String> {
    let main = if notes.is_empty() {
        "<p>There's nothing to see here... yet!</p>".to_owned()
    } else {
        let mut rows = String::new();
        for note in notes {
            let _ = write!(
                rows,
                r#"<tr><td><a href="/note/view/{}">{}</a></td><td>{}</td></tr>"#,
                note.id,
                escape(&note.title),
                fmt_date(note.created)
            );
        }
        format!("<h2>Latest Notes</h2>\n<table><tr><th>Title</th><th>Created</th></tr>{rows}</table>")
    };
    layout(data, "Home", &main)
}

#[must_use]
pub fn about(data: &TemplateData) -> Html<String> {
    layout(data, "About", "<h2>About</h2>\n<p>Notebox is a place to paste and share short-lived notes.</p>")
}

#[must_use]
pub fn note_view(data: &TemplateData, note: &Note) -> Html<String> {
    let main = format!(
        r#"<div class="note">
<div class="metadata"><strong>{title}</strong></div>
<pre><code>{content}</code></pre>
<div class="metadata"><time>Created: {created}</time><time>Expires: {expires}</time></div>
</div>"#,
        title = escape(&note.title),
        content = escape(&note.content),
        created = fmt_date(note.created),
        expires = fmt_date(note.expires),
    );
    layout(data, &format!("Note {}", note.id), &main)
}

#[must_use]
pub fn note_create(data: &TemplateData, form: &NoteForm, v: &Validator) -> Html<String> {
    let radios = [(365, "One Year"), (7, "One Week"), (1, "One Day")].iter().fold(
        String::new(),
        |mut out, (days, label)| {
            let checked = if form.expires == *days { " checked" } else { "" };
            let _ = write!(out, r#"<input type="radio" name="expires" value="{days}"{checked}> {label} "#);
            out
        },
    );
    let main = format!(
        r#"<form action="/note/create" method="POST">
{csrf}
<div><label>Title:</label>{title_err}<input type="text" name="title" value="{title}"></div>
<div><label>Content:</label>{content_err}<textarea name="content">{content}</textarea></div>
<div><label>Delete in:</label>{expires_err}{radios}</div>
<div><input type="submit" value="Publish note"></div>
</form>"#,
        csrf = data.csrf_input(),
        title_err = field_error(v, "title"),
        title = escape(&form.title),
        content_err = field_error(v, "content"),
        content = escape(&form.content),
        expires_err = field_error(v, "expires"),
    );
    layout(data, "Create a New Note", &main)
}

#[must_use]
pub fn signup(data: &TemplateData, form: &SignupForm, v: &Validator) -> Html<String> {
    let main = format!(
        r#"<form action="/user/signup" method="POST" novalidate>
{csrf}
<div><label>Name:</label>{name_err}<input type="text" name="name" value="{name}"></div>
<div><label>Email:</label>{email_err}<input type="email" name="email" value="{email}"></div>
<div><label>Password:</label>{password_err}<input type="password" name="password"></div>
<div><input type="submit" value="Signup"></div>
</form>"#,
        csrf = data.csrf_input(),
        name_err = field_error(v, "name"),
        name = escape(&form.name),
        email_err = field_error(v, "email"),
        email = escape(&form.email),
        password_err = field_error(v, "password"),
    );
    layout(data, "Signup", &main)
}

#[must_use]
pub fn login(data: &TemplateData, form: &LoginForm, v: &Validator) -> Html<String> {
    let main = format!(
        r#"<form action="/user/login" method="POST" novalidate>
{csrf}
{errors}
<div><label>Email:</label>{email_err}<input type="email" name="email" value="{email}"></div>
<div><label>Password:</label>{password_err}<input type="password" name="password"></div>
<div><input type="submit" value="Login"></div>
</form>"#,
        csrf = data.csrf_input(),
        errors = non_field_errors(v),
        email_err = field_error(v, "email"),
        email = escape(&form.email),
        password_err = field_error(v, "password"),
    );
    layout(data, "Login", &main)
}

#[must_use]
pub fn account(data: &TemplateData, user: &User) -> Html<String> {
    let main = format!(
        r#"<h2>Your Account</h2>
<table>
<tr><th>Name</th><td>{name}</td></tr>
<tr><th>Email</th><td>{email}</td></tr>
<tr><th>Joined</th><td>{joined}</td></tr>
<tr><th>Password</th><td><a href="/account/password/update">Change password</a></td></tr>
</table>"#,
        name = escape(&user.name),
        email = escape(&user.email),
        joined = fmt_date(user.created),
    );
    layout(data, "Your Account", &main)
}

#[must_use]
pub fn password_update(data: &TemplateData, v: &Validator) -> Html<String> {
    let main = format!(
        r#"<h2>Change Password</h2>
<form action="/account/password/update" method="POST" novalidate>
{csrf}
<div><label>Current password:</label>{current_err}<input type="password" name="current_password"></div>
<div><label>New password:</label>{new_err}<input type="password" name="new_password"></div>
<div><label>Confirm new password:</label>{confirm_err}<input type="password" name="new_password_confirmation"></div>
<div><input type="submit" value="Change password"></div>
</form>"#,
        csrf = data.csrf_input(),
        current_err = field_error(v, "current_password"),
        new_err = field_error(v, "new_password"),
        confirm_err = field_error(v, "new_password_confirmation"),
    );
    layout(data, "Change Password", &main)
}
