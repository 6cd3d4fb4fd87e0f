#[cfg(test)]
mod tests {
    use crate::constants::{
        ANNOTATION_AUTHORIZATOR, ANNOTATION_INGRESS, ANNOTATION_NAMESPACE, LISTENER_IMAGE,
    };
    use crate::crd::{AuthorizatorConfig, AuthorizatorSpec, IngressProvider, IngressRef};
    use crate::resources::*;
    use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

    fn sample_spec(replicas: i32) -> AuthorizatorSpec {
        AuthorizatorSpec {
            ingress: IngressRef {
                name: "shop-front".to_string(),
                class: None,
                provider: IngressProvider::IngressNginx,
            },
            rulesets: serde_json::json!([{ "uri": "/", "uritype": "prefix" }]),
            validators: serde_json::json!([]),
            config: AuthorizatorConfig {
                replicas,
                prometheus: true,
                api: true,
                log_level: 2,
            },
        }
    }

    #[test]
    fn test_deployment_name_and_replicas() {
        let deployment = build_deployment("store", "shop", &sample_spec(3));

        assert_eq!(
            deployment.metadata.name.as_deref(),
            Some("authgate-shop-deploy")
        );
        assert_eq!(deployment.metadata.namespace.as_deref(), Some("store"));
        assert_eq!(deployment.spec.as_ref().unwrap().replicas, Some(3));
    }

    #[test]
    fn test_deployment_rolling_update_strategy() {
        let deployment = build_deployment("store", "shop", &sample_spec(2));
        let strategy = deployment.spec.unwrap().strategy.unwrap();

        assert_eq!(strategy.type_.as_deref(), Some("RollingUpdate"));
        let rolling = strategy.rolling_update.unwrap();
        assert_eq!(rolling.max_surge, Some(IntOrString::Int(1)));
        assert_eq!(rolling.max_unavailable, Some(IntOrString::Int(0)));
    }

    #[test]
    fn test_deployment_pod_template_back_references() {
        let deployment = build_deployment("store", "shop", &sample_spec(1));
        let annotations = deployment
            .spec
            .unwrap()
            .template
            .metadata
            .unwrap()
            .annotations
            .unwrap();

        assert_eq!(
            annotations.get(ANNOTATION_INGRESS).map(String::as_str),
            Some("shop-front")
        );
        assert_eq!(
            annotations.get(ANNOTATION_AUTHORIZATOR).map(String::as_str),
            Some("shop")
        );
        assert_eq!(
            annotations.get(ANNOTATION_NAMESPACE).map(String::as_str),
            Some("store")
        );
    }

    #[test]
    fn test_deployment_selector_matches_pod_labels() {
        let deployment = build_deployment("store", "shop", &sample_spec(1));
        let spec = deployment.spec.unwrap();

        let selector = spec.selector.match_labels.unwrap();
        let pod_labels = spec.template.metadata.unwrap().labels.unwrap();
        assert_eq!(selector, pod_labels);
        assert_eq!(
            pod_labels.get("app").map(String::as_str),
            Some("authgate-shop-listener")
        );
    }

    #[test]
    fn test_deployment_container() {
        let deployment = build_deployment("store", "shop", &sample_spec(1));
        let pod_spec = deployment.spec.unwrap().template.spec.unwrap();

        assert_eq!(
            pod_spec.service_account_name.as_deref(),
            Some("authgate-shop-sa")
        );

        let container = &pod_spec.containers[0];
        assert_eq!(container.image.as_deref(), Some(LISTENER_IMAGE));

        let ports: Vec<i32> = container
            .ports
            .as_ref()
            .unwrap()
            .iter()
            .map(|p| p.container_port)
            .collect();
        assert_eq!(ports, vec![3000, 3882]);
    }

    #[test]
    fn test_listener_env_passes_spec_through() {
        let spec = sample_spec(1);
        let env = build_listener_env("store", "shop", &spec);

        let get = |name: &str| {
            env.iter()
                .find(|e| e.name == name)
                .and_then(|e| e.value.clone())
                .unwrap()
        };

        assert_eq!(get("AUTHGATE_NAME"), "shop");
        assert_eq!(get("AUTHGATE_NAMESPACE"), "store");
        assert_eq!(get("AUTHGATE_API"), "true");
        assert_eq!(get("AUTHGATE_PROMETHEUS"), "true");
        assert_eq!(get("AUTHGATE_LOG_LEVEL"), "2");

        // rulesets/validators are JSON-encoded verbatim
        let rulesets: serde_json::Value = serde_json::from_str(&get("AUTHGATE_RULESETS")).unwrap();
        assert_eq!(rulesets, spec.rulesets);
        let validators: serde_json::Value =
            serde_json::from_str(&get("AUTHGATE_VALIDATORS")).unwrap();
        assert_eq!(validators, spec.validators);
    }

    #[test]
    fn test_service_shape() {
        let service = build_service("store", "shop");

        assert_eq!(service.metadata.name.as_deref(), Some("authgate-shop-svc"));
        let spec = service.spec.unwrap();
        assert_eq!(spec.type_.as_deref(), Some("ClusterIP"));
        assert_eq!(
            spec.selector.unwrap().get("app").map(String::as_str),
            Some("authgate-shop-listener")
        );

        let ports: Vec<i32> = spec.ports.unwrap().iter().map(|p| p.port).collect();
        assert_eq!(ports, vec![3000, 3882]);
    }

    #[test]
    fn test_rbac_bundle() {
        let sa = build_service_account("store", "shop");
        assert_eq!(sa.metadata.name.as_deref(), Some("authgate-shop-sa"));

        let role = build_role("store", "shop");
        assert_eq!(role.metadata.name.as_deref(), Some("authgate-shop-role"));
        let rule = &role.rules.as_ref().unwrap()[0];
        assert_eq!(rule.api_groups.as_ref().unwrap(), &vec!["authgate.dev"]);
        assert_eq!(rule.resources.as_ref().unwrap(), &vec!["authorizators"]);
        assert!(rule.verbs.contains(&"watch".to_string()));

        let binding = build_role_binding("store", "shop");
        assert_eq!(
            binding.metadata.name.as_deref(),
            Some("authgate-shop-rolebinding")
        );
        assert_eq!(binding.role_ref.name, "authgate-shop-role");
        let subject = &binding.subjects.as_ref().unwrap()[0];
        assert_eq!(subject.kind, "ServiceAccount");
        assert_eq!(subject.name, "authgate-shop-sa");
    }

    #[test]
    fn test_ingress_back_reference_round_trip() {
        let deployment = build_deployment("store", "shop", &sample_spec(1));
        assert_eq!(
            ingress_back_reference(&deployment).as_deref(),
            Some("shop-front")
        );
    }

    #[test]
    fn test_ingress_back_reference_absent() {
        let deployment = k8s_openapi::api::apps::v1::Deployment::default();
        assert!(ingress_back_reference(&deployment).is_none());
    }
}
