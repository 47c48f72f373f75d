// Property tests for the CDN host allow-list

use pace_pro_sw::worker::host_matches;
use proptest::prelude::*;

fn label() -> impl Strategy<Value = String> {
    "[a-z0-9]{1,12}"
}

fn domain() -> impl Strategy<Value = String> {
    prop::collection::vec(label(), 2..4).prop_map(|labels| labels.join("."))
}

proptest! {
    #[test]
    fn host_always_matches_itself(host in domain()) {
        prop_assert!(host_matches(&host, &host));
        prop_assert!(host_matches(&host.to_ascii_uppercase(), &host));
    }

    #[test]
    fn subdomains_match(sub in label(), allowed in domain()) {
        let host = format!("{}.{}", sub, allowed);
        prop_assert!(host_matches(&host, &allowed));
    }

    #[test]
    fn glued_prefixes_do_not_match(prefix in label(), allowed in domain()) {
        let host = format!("{}{}", prefix, allowed);
        prop_assert!(!host_matches(&host, &allowed));
    }

    #[test]
    fn allowed_as_prefix_does_not_match(allowed in domain(), suffix in domain()) {
        let host = format!("{}.{}", allowed, suffix);
        prop_assume!(!host.ends_with(&format!(".{}", allowed)));
        prop_assert!(!host_matches(&host, &allowed));
    }
}
