#[cfg(test)]
mod tests {
    use crate::constants::{
        NGINX_INGRESS_AUTH_METHOD, NGINX_INGRESS_AUTH_RESPONSE_HEADERS, NGINX_INGRESS_AUTH_URL,
        NGINX_ORG_LOCATION_SNIPPETS, NGINX_ORG_SERVER_SNIPPETS,
    };
    use crate::naming;
    use crate::providers::*;

    fn url() -> String {
        naming::validate_url("store", "shop", "cluster.local")
    }

    #[test]
    fn test_ingress_nginx_annotation_set() {
        let annotations = ingress_nginx_annotations(&url());

        assert_eq!(annotations.len(), 3);
        assert_eq!(
            annotations.get(NGINX_INGRESS_AUTH_URL).map(String::as_str),
            Some("http://authgate-shop-svc.store.svc.cluster.local:3000/validate/shop")
        );
        assert_eq!(
            annotations
                .get(NGINX_INGRESS_AUTH_METHOD)
                .map(String::as_str),
            Some("GET")
        );
        assert_eq!(
            annotations
                .get(NGINX_INGRESS_AUTH_RESPONSE_HEADERS)
                .map(String::as_str),
            Some("WWW-Authenticate")
        );
    }

    #[test]
    fn test_nginx_org_annotation_set() {
        let annotations = nginx_org_annotations(&url());

        assert_eq!(annotations.len(), 2);
        assert_eq!(
            annotations
                .get(NGINX_ORG_LOCATION_SNIPPETS)
                .map(String::as_str),
            Some("auth_request /authgate-auth;")
        );

        let server = annotations.get(NGINX_ORG_SERVER_SNIPPETS).unwrap();
        assert!(server.contains("location = /authgate-auth"));
        assert!(server.contains("internal;"));
        assert!(server.contains(&url()));
        assert!(server.contains("proxy_pass_request_body off;"));
        assert!(server.contains("X-Original-URI $request_uri"));
    }

    #[test]
    fn test_traefik_middleware_reference() {
        assert_eq!(
            traefik_middleware_reference("store", "shop"),
            "store-authgate-shop-forwardauth@kubernetescrd"
        );
    }

    #[test]
    fn test_traefik_middleware_object_shape() {
        let middleware = build_middleware("store", "shop", "cluster.local").unwrap();
        let json = serde_json::to_value(&middleware).unwrap();

        assert_eq!(json["apiVersion"], "traefik.io/v1alpha1");
        assert_eq!(json["kind"], "Middleware");
        assert_eq!(json["metadata"]["name"], "authgate-shop-forwardauth");
        assert_eq!(json["metadata"]["namespace"], "store");
        assert_eq!(
            json["spec"]["forwardAuth"]["address"],
            "http://authgate-shop-svc.store.svc.cluster.local:3000/validate/shop"
        );
    }
}
