//! Message catalogue for English and Turkish.

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Lang {
    #[default]
    En,
    Tr,
}

impl Lang {
    fn from_tag(tag: &str) -> Option<Self> {
        let primary = tag.split(['-', '_']).next()?.trim();
        if primary.eq_ignore_ascii_case("en") {
            Some(Self::En)
        } else if primary.eq_ignore_ascii_case("tr") {
            Some(Self::Tr)
        } else {
            None
        }
    }

    /// Pick the highest-weighted supported language from an
    /// `Accept-Language` value, falling back to English.
    #[must_use]
    pub fn from_accept_language(header: Option<&str>) -> Self {
        let Some(header) = header else {
            return Self::default();
        };
        let mut best: Option<(Self, f32)> = None;
        for entry in header.split(',') {
            let mut parts = entry.split(';');
            let Some(lang) = parts.next().and_then(Self::from_tag) else {
                continue;
            };
            let weight = parts
                .find_map(|param| param.trim().strip_prefix("q="))
                .and_then(|q| q.trim().parse::<f32>().ok())
                .unwrap_or(1.0);
            if weight > 0.0 && best.map_or(true, |(_, current)| weight > current) {
                best = Some((lang, weight));
            }
        }
        best.map(|(lang, _)| lang).unwrap_or_default()
    }
}

/// Resolve a message key. Unknown keys come back unchanged.
#[must_use]
pub fn translate(lang: Lang, key: &str) -> &str {
    let text = match lang {
        Lang::En => english(key),
        Lang::Tr => turkish(key),
    };
    text.unwrap_or(key)
}

fn english(key: &str) -> Option<&'static str> {
    Some(match key {
        "username_null" => "Username cannot be null",
        "username_size" => "Must have min 4 and max 32 characters",
        "email_null" => "E-mail cannot be null",
        "email_invalid" => "E-mail is not valid",
        "email_inuse" => "E-mail in use",
        "email_not_inuse" => "E-mail not found",
        "password_null" => "Password cannot be null",
        "password_size" => "Password must be at least 6 characters",
        "password_pattern" => {
            "Password must have at least 1 uppercase, 1 lowercase letter and 1 number"
        }
        "email_failure" => "E-mail Failure",
        "user_create_success" => "User created",
        "account_activation_success" => "Account is activated",
        "account_activation_failure" => "This account is either active or the token is invalid",
        "validation_failure" => "Validation Failure",
        "user_not_found" => "User not found",
        "authentication_failure" => "Incorrect credentials",
        "inactive_authentication_failure" => "Account is inactive",
        "unauthorized_user_update" => "You are not authorized to update user",
        "unauthorized_user_delete" => "You are not authorized to delete user",
        "unauthorized_password_reset" => {
            "You are not authorized to update your password. Please follow the password reset steps again."
        }
        "password_reset_request_success" => "Check your e-mail for resetting your password",
        "invalid_token" => "Invalid token",
        "token_expired" => "Token expired",
        "internal_error" => "Internal server error",
        _ => return None,
    })
}

fn turkish(key: &str) -> Option<&'static str> {
    Some(match key {
        "username_null" => "Kullanıcı adı boş olamaz",
        "username_size" => "En az 4 en fazla 32 karakter olmalı",
        "email_null" => "E-posta boş olamaz",
        "email_invalid" => "E-posta geçerli değil",
        "email_inuse" => "Bu e-posta kullanılıyor",
        "email_not_inuse" => "E-posta bulunamadı",
        "password_null" => "Şifre boş olamaz",
        "password_size" => "Şifre en az 6 karakter olmalı",
        "password_pattern" => {
            "Şifrede en az 1 büyük, 1 küçük harf ve 1 sayı bulunmalıdır"
        }
        "email_failure" => "E-posta gönderiminde hata oluştu",
        "user_create_success" => "Kullanıcı oluşturuldu",
        "account_activation_success" => "Hesabınız aktifleştirildi",
        "account_activation_failure" => "Bu hesap zaten aktif veya geçersiz bir anahtar kullanıldı",
        "validation_failure" => "Girilen değerler uygun değil",
        "user_not_found" => "Kullanıcı bulunamadı",
        "authentication_failure" => "Hatalı giriş bilgileri",
        "inactive_authentication_failure" => "Hesabınız aktif değil",
        "unauthorized_user_update" => "Kullanıcıyı güncellemek için yetkiniz yok",
        "unauthorized_user_delete" => "Kullanıcıyı silmek için yetkiniz yok",
        "unauthorized_password_reset" => {
            "Şifrenizi güncellemek için yetkiniz yok. Lütfen şifre sıfırlama adımlarını tekrar uygulayın."
        }
        "password_reset_request_success" => "Şifrenizi yenilemek için e-postanızı kontrol edin",
        "invalid_token" => "Geçersiz anahtar",
        "token_expired" => "Anahtarın süresi doldu",
        "internal_error" => "Sunucu hatası",
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accept_language_selection() {
        assert_eq!(Lang::from_accept_language(None), Lang::En);
        assert_eq!(Lang::from_accept_language(Some("tr")), Lang::Tr);
        assert_eq!(Lang::from_accept_language(Some("tr-TR,tr;q=0.9")), Lang::Tr);
        assert_eq!(Lang::from_accept_language(Some("de,tr;q=0.5,en;q=0.8")), Lang::En);
        assert_eq!(Lang::from_accept_language(Some("fr")), Lang::En);
        assert_eq!(Lang::from_accept_language(Some("tr;q=0")), Lang::En);
    }

    #[test]
    fn every_english_key_has_a_turkish_twin() {
        let keys = [
            "username_null",
            "username_size",
            "email_null",
            "email_invalid",
            "email_inuse",
            "email_not_inuse",
            "password_null",
            "password_size",
            "password_pattern",
            "email_failure",
            "user_create_success",
            "account_activation_success",
            "account_activation_failure",
            "validation_failure",
            "user_not_found",
            "authentication_failure",
            "inactive_authentication_failure",
            "unauthorized_user_update",
            "unauthorized_user_delete",
            "unauthorized_password_reset",
            "password_reset_request_success",
            "invalid_token",
            "token_expired",
            "internal_error",
        ];
        for key in keys {
            assert!(english(key).is_some(), "{key}");
            assert!(turkish(key).is_some(), "{key}");
        }
    }

    #[test]
    fn unknown_key_passes_through() {
        assert_eq!(translate(Lang::Tr, "no_such_key"), "no_such_key");
        assert_eq!(translate(Lang::En, "authentication_failure"), "Incorrect credentials");
    }
}
