//! Inline-rendered HTML, one function per page. Fragments only; the
//! app predates any notion of a layout.

use crate::nature::NatureImage;
use crate::validate::Invalid;

pub fn home_anonymous() -> String {
    "<h1>Create an account or log in</h1>\
     <button onclick=\"window.location.href='/signup'\">Sign up</button>\
     <button onclick=\"window.location.href='/login'\">Log in</button>"
        .to_string()
}

pub fn home_member(username: &str) -> String {
    format!(
        "<h1>Hello, {}!</h1>\
         <button onclick=\"window.location.href='/members'\">Go to Members Area</button>\
         <button onclick=\"window.location.href='/logout'\">Log out</button>",
        escape(username),
    )
}

pub fn signup_form() -> String {
    "<h1>Create user</h1>\
     <form action='/submitUser' method='post'>\
     <input name='username' type='text' placeholder='Username'>\
     <input name='email' type='email' placeholder='Email'>\
     <input name='password' type='password' placeholder='Password'>\
     <button>Submit</button>\
     </form>"
        .to_string()
}

pub fn login_form() -> String {
    "<h1>Log in</h1>\
     <form action='/loggingin' method='post'>\
     <input name='email' type='text' placeholder='Email'>\
     <input name='password' type='password' placeholder='Password'>\
     <button>Submit</button>\
     </form>"
        .to_string()
}

pub fn signup_error(error: &Invalid) -> String {
    format!("Error: {error}. Please <a href=\"/signup\">try again</a>.")
}

pub fn wrong_password() -> String {
    "Incorrect password. Please <a href=\"/login\">try again</a>.".to_string()
}

pub fn members(username: &str, image: NatureImage) -> String {
    format!(
        "<h1>Hello, {}!</h1>\
         <img src=\"/{}\" alt=\"Random image\">\
         <br><br>\
         <button onclick=\"window.location.href='/logout'\">Log out</button>",
        escape(username),
        image.file(),
    )
}

pub fn nature(image: NatureImage) -> String {
    format!("<img src='/{}' style='width:250px;'>", image.file())
}

pub fn nature_unknown(id: u32) -> String {
    format!("Invalid nature id: {id}")
}

pub fn injection_usage() -> String {
    "<h3>No user provided - try /nosql-injection?user=name</h3>\
     <h3>or /nosql-injection?user[$ne]=name</h3>"
        .to_string()
}

pub fn injection_detected() -> String {
    "<h1 style='color:darkred;'>A NoSQL injection attack was detected!!</h1>".to_string()
}

pub fn injection_greeting(username: &str) -> String {
    format!("<h1>Hello, {}!</h1>", escape(username))
}

pub fn not_found() -> String {
    "Page not found - 404".to_string()
}

/// Minimal entity escaping for user-supplied text.
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());

    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }

    out
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn user_supplied_text_is_escaped() {
        let page = injection_greeting("<script>alert(1)</script>");

        assert!(!page.contains("<script>"));
        assert!(page.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
    }

    #[test]
    fn member_pages_greet_by_name() {
        let page = members("alice", NatureImage::AutumnWalk);

        assert!(page.contains("Hello, alice!"));
        assert!(page.contains("autumn-walk.jpeg"));
        assert!(page.contains("/logout"));

        assert!(home_member("bob & co").contains("bob &amp; co"));
    }

    #[test]
    fn forms_post_to_their_handlers() {
        assert!(signup_form().contains("action='/submitUser'"));
        assert!(login_form().contains("action='/loggingin'"));
    }

    #[test]
    fn validation_errors_render_with_a_retry_link() {
        use crate::validate::{Param, StringSchema};

        let err = StringSchema::string()
            .email()
            .required()
            .validate("email", &Param::Str("nope".into()))
            .unwrap_err();

        let page = signup_error(&err);
        assert!(page.contains("\"email\" must be a valid email"));
        assert!(page.contains("<a href=\"/signup\">try again</a>"));
    }
}
