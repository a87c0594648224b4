//! Server-rendered pages. Every interpolated value goes through [`escape`].

use std::fmt::Write;

use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};

use crate::models::Siswa;
use crate::validation::{Field, Submission, DATE_FORMAT};

pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(title: &str, username: Option<&str>, body: &str) -> String {
    let nav = match username {
        Some(username) => format!(
            "<nav><a href=\"/\">Home</a> | <a href=\"/siswa\">Data Siswa</a> | \
             <a href=\"/about\">About</a> | <span>{}</span> <a href=\"/logout\">Logout</a></nav>",
            escape(username)
        ),
        None => String::new(),
    };
    format!(
        "<!DOCTYPE html>\n<html lang=\"id\">\n<head><meta charset=\"utf-8\"><title>{title}</title></head>\n\
         <body>\n{nav}\n<main>\n<h1>{title}</h1>\n{body}\n</main>\n</body>\n</html>\n",
        title = escape(title),
        nav = nav,
        body = body
    )
}

fn flash_list(flash: &[String]) -> String {
    if flash.is_empty() {
        return String::new();
    }
    let mut out = String::from("<ul class=\"flash\">");
    for msg in flash {
        let _ = write!(out, "<li>{}</li>", escape(msg));
    }
    out.push_str("</ul>");
    out
}

pub fn login_page(flash: &[String]) -> String {
    let body = format!(
        "{}<form method=\"post\" action=\"/login\">\
         <label>Username <input type=\"text\" name=\"username\" required></label>\
         <label>Password <input type=\"password\" name=\"password\" required></label>\
         <button type=\"submit\">Login</button></form>",
        flash_list(flash)
    );
    layout("Login Admin", None, &body)
}

pub fn home_page(username: &str) -> String {
    let body = format!("<p>Selamat datang, {}!</p>", escape(username));
    layout("Halaman Home", Some(username), &body)
}

pub fn about_page(username: &str) -> String {
    let body = "<p>Aplikasi pengelolaan data siswa.</p>";
    layout("Halaman About", Some(username), body)
}

pub fn siswa_list(username: &str, records: &[Siswa], flash: &[String]) -> String {
    let mut body = flash_list(flash);
    body.push_str("<p><a href=\"/siswa/add\">Tambah Data Siswa</a></p>");
    if records.is_empty() {
        body.push_str("<p>Belum ada data siswa.</p>");
        return layout("Halaman Data Siswa", Some(username), &body);
    }

    body.push_str("<table><thead><tr><th>#</th>");
    for field in Field::ALL {
        let _ = write!(body, "<th>{}</th>", escape(field.label()));
    }
    body.push_str("<th>Aksi</th></tr></thead><tbody>");
    for (idx, siswa) in records.iter().enumerate() {
        let nisn = escape(&siswa.nisn);
        let _ = write!(
            body,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td>\
             <td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td>\
             <td><a href=\"/siswa/edit/{key}\">Ubah</a>\
             <form method=\"post\" action=\"/siswa?_method=DELETE\">\
             <input type=\"hidden\" name=\"nisn\" value=\"{nisn}\">\
             <button type=\"submit\">Hapus</button></form></td></tr>",
            idx + 1,
            escape(&siswa.nama),
            escape(&siswa.jk),
            nisn,
            escape(&siswa.nik),
            escape(&siswa.nokk),
            escape(&siswa.tingkat),
            escape(&siswa.rombel),
            escape(&siswa.terdaftar),
            escape(&siswa.ttl),
            siswa.tgl_masuk.format(DATE_FORMAT),
            nisn = nisn,
            key = utf8_percent_encode(&siswa.nisn, NON_ALPHANUMERIC),
        );
    }
    body.push_str("</tbody></table>");
    layout("Halaman Data Siswa", Some(username), &body)
}

fn siswa_fields(submission: &Submission) -> String {
    let mut out = String::new();
    if !submission.errors.is_empty() {
        out.push_str("<ul class=\"errors\">");
        for msg in submission.messages() {
            let _ = write!(out, "<li>{}</li>", escape(msg));
        }
        out.push_str("</ul>");
    }
    for field in Field::ALL {
        let kind = match field {
            Field::TglMasuk => "date",
            _ => "text",
        };
        let class = if submission.has_error(field) { " class=\"invalid\"" } else { "" };
        let _ = write!(
            out,
            "<label>{label} <input type=\"{kind}\" name=\"{name}\" value=\"{value}\"{class} required></label>",
            label = escape(field.label()),
            kind = kind,
            name = field.name(),
            value = escape(field.value(&submission.form)),
            class = class,
        );
    }
    out
}

pub fn add_form(username: &str, submission: &Submission) -> String {
    let body = format!(
        "<form method=\"post\" action=\"/siswa\">{}<button type=\"submit\">Tambah Data</button></form>",
        siswa_fields(submission)
    );
    layout("Form Tambah Data Siswa", Some(username), &body)
}

pub fn edit_form(username: &str, submission: &Submission) -> String {
    let body = format!(
        "<form method=\"post\" action=\"/siswa?_method=PUT\">\
         <input type=\"hidden\" name=\"oldNisn\" value=\"{}\">{}\
         <button type=\"submit\">Ubah Data</button></form>",
        escape(&submission.form.old_nisn),
        siswa_fields(submission)
    );
    layout("Form Ubah Data Siswa", Some(username), &body)
}

pub fn error_page(title: &str, message: &str) -> String {
    let body = format!("<p>{}</p><p><a href=\"/\">Kembali</a></p>", escape(message));
    layout(title, None, &body)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::models::NewSiswa;
    use crate::store::UniqueField;
    use crate::validation::{Mode, SiswaForm};

    #[test]
    fn escapes_markup() {
        assert_eq!(escape("<b>\"Tom\" & 'Jerry'</b>"), "&lt;b&gt;&quot;Tom&quot; &amp; &#x27;Jerry&#x27;&lt;/b&gt;");
    }

    #[test]
    fn edit_form_echoes_submission_and_errors() {
        let form = SiswaForm {
            nama: "<script>".to_string(),
            nisn: "87654321".to_string(),
            old_nisn: "12345678".to_string(),
            ..SiswaForm::default()
        };
        let html = edit_form("admin", &Submission::conflict(form, Mode::Update, UniqueField::Nisn));
        assert!(html.contains("name=\"oldNisn\" value=\"12345678\""));
        assert!(html.contains("name=\"nisn\" value=\"87654321\" class=\"invalid\""));
        assert!(html.contains("NISN sudah digunakan!"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn edit_link_percent_encodes_nisn() {
        let siswa = NewSiswa {
            nama: "Budi".to_string(),
            jk: "L".to_string(),
            nisn: "12/45?78".to_string(),
            nik: "1234567890123456".to_string(),
            nokk: "1234567890123456".to_string(),
            tingkat: "7".to_string(),
            rombel: "7A".to_string(),
            terdaftar: "Baru".to_string(),
            ttl: "Bogor".to_string(),
            tgl_masuk: NaiveDate::from_ymd_opt(2023, 7, 17).unwrap(),
        }
        .into_record();
        let html = siswa_list("admin", &[siswa], &[]);
        assert!(html.contains("href=\"/siswa/edit/12%2F45%3F78\""));
        assert!(html.contains("name=\"nisn\" value=\"12/45?78\""));
    }

    #[test]
    fn login_page_shows_flash() {
        let html = login_page(&["Username atau password salah!".to_string()]);
        assert!(html.contains("<li>Username atau password salah!</li>"));
    }
}
