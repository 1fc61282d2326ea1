use super::data::{is_direction, Attribute, SetupRole};
use super::AttributeError;

/// Turn one offered attribute into the attribute the answering side puts back.
///
/// * `setup` follows RFC 4145. `active` → `passive`, `passive` → `active`,
///   `actpass` → `active`, anything else → `holdconn`.
/// * `connection` is always answered with `new`.
/// * Directions are mirrored per RFC 3264 6.1.
/// * Everything else is returned as is.
pub fn intersect(attr: &Attribute) -> Result<Attribute, AttributeError> {
    if attr.key == "setup" {
        let offered = attr.value.parse().unwrap_or(SetupRole::HoldConn);
        return Ok(Attribute::new("setup", offered.answer().as_str()));
    }

    // We have no way of knowing whether an existing connection could be
    // reused, so a new one is always requested.
    if attr.key == "connection" {
        return Ok(Attribute::new("connection", "new"));
    }

    if let Some(dir) = is_direction(attr) {
        if !attr.value.is_empty() {
            warn!("Invalid attribute direction: {}:{}", attr.key, attr.value);
            return Err(AttributeError::InvalidDirection(format!(
                "{}:{}",
                attr.key, attr.value
            )));
        }
        return Ok(dir.answer().to_attribute());
    }

    Ok(attr.clone())
}

#[cfg(test)]
mod test {
    use super::*;

    fn setup(v: &str) -> String {
        intersect(&Attribute::new("setup", v)).unwrap().value
    }

    #[test]
    fn setup_rfc4145() {
        assert_eq!(setup("active"), "passive");
        assert_eq!(setup("passive"), "active");
        assert_eq!(setup("actpass"), "active");
        assert_eq!(setup("holdconn"), "holdconn");
        assert_eq!(setup("bogus"), "holdconn");
        assert_eq!(setup(""), "holdconn");
    }

    #[test]
    fn connection_always_new() {
        let a = intersect(&Attribute::new("connection", "existing")).unwrap();
        assert_eq!(a, Attribute::new("connection", "new"));
    }

    #[test]
    fn directions_mirror() {
        for (offer, answer) in [
            ("sendonly", "recvonly"),
            ("recvonly", "sendonly"),
            ("sendrecv", "sendrecv"),
            ("inactive", "inactive"),
        ] {
            let a = intersect(&Attribute::flag(offer)).unwrap();
            assert_eq!(a, Attribute::flag(answer));
        }
    }

    #[test]
    fn direction_case_insensitive_key() {
        let a = intersect(&Attribute::flag("SendOnly")).unwrap();
        assert_eq!(a, Attribute::flag("recvonly"));
    }

    #[test]
    fn direction_with_value_is_error() {
        let err = intersect(&Attribute::new("sendonly", "foo")).unwrap_err();
        assert!(matches!(err, AttributeError::InvalidDirection(_)));
    }

    #[test]
    fn others_pass_through() {
        let a = Attribute::new("mid", "audio0");
        assert_eq!(intersect(&a).unwrap(), a);
    }
}
