//! Deterministic fallback artifact bodies.
//!
//! Large bodies are kept as consts with `{placeholder}` markers and rendered
//! with `str::replace`, so literal braces in HCL and YAML stay untouched.

/// Generic multi-language Dockerfile that tries common run patterns.
const DOCKERFILE: &str = r#"# Generated Dockerfile
FROM ubuntu:22.04

RUN apt-get update && apt-get install -y \
    ca-certificates curl git python3 python3-pip nodejs npm \
    && rm -rf /var/lib/apt/lists/*

WORKDIR /app
COPY . /app

RUN if [ -f requirements.txt ]; then pip3 install --no-cache-dir -r requirements.txt; fi
RUN if [ -f package.json ]; then npm ci || npm install; fi
RUN if [ -f package.json ]; then npm run build || true; fi

EXPOSE {port}

CMD bash -lc ' \
  if [ -f manage.py ]; then python3 manage.py migrate || true; fi; \
  if [ -f app.py ] || [ -f main.py ]; then python3 -m gunicorn -k uvicorn.workers.UvicornWorker app:app --bind 0.0.0.0:{port} || python3 -m uvicorn app:app --host 0.0.0.0 --port {port}; \
  elif [ -f package.json ]; then npm start -- --port {port}; \
  else python3 -m http.server {port}; fi'
"#;

const COMPOSE_FLAT: &str = r#"version: '3.9'
services:
  app:
    build: .
    container_name: app
    restart: unless-stopped
    ports:
      - "8080:{port}"
    environment:
      - PORT={port}
"#;

const COMPOSE_NESTED: &str = r#"version: '3.9'
services:
  app:
    build:
      context: ./repo
      dockerfile: ../Dockerfile
    container_name: app
    restart: unless-stopped
    ports:
      - "8080:{port}"
    environment:
      - PORT={port}
"#;

const SETUP_SCRIPT: &str = r#"#!/usr/bin/env bash
set -euo pipefail
echo "No setup required"
"#;

/// Makefile driving the deployment on the provisioned host. `make up` is the
/// entry point the provisioning bootstrap invokes.
const MAKEFILE: &str = ".PHONY: up down logs

up:
	@if [ -f setup.sh ]; then \\
		echo \"Running setup.sh\"; \\
		bash ./setup.sh; \\
	fi
	docker compose up -d --build
	docker compose ps

logs:
	docker compose logs -f --tail=100

down:
	docker compose down -v
";

/// Canonical Ubuntu 24.04 lookup, usable in any region without extra IAM.
pub(crate) const AMI_DATA: &str = r#"data "aws_ami" "ubuntu" {
  most_recent = true
  owners      = ["099720109477"] # Canonical

  filter {
    name   = "name"
    values = ["ubuntu/images/hvm-ssd-gp3/ubuntu-noble-24.04-amd64-server-*"]
  }
}"#;

/// Host bootstrap run over ssh after the archive upload. Mirrors are forced
/// to IPv4 and rewritten away from ec2.archive.ubuntu.com, which stalls on
/// fresh instances in some regions.
pub(crate) const REMOTE_EXEC: &str = r#"provisioner "remote-exec" {
  inline = [
    "sudo -n sed -i 's|http://[^ ]*ec2.archive.ubuntu.com/ubuntu|http://archive.ubuntu.com/ubuntu|g' /etc/apt/sources.list || true",
    "sudo -n env DEBIAN_FRONTEND=noninteractive apt-get update -o Acquire::ForceIPv4=true -o Acquire::Retries=3 -o Acquire::http::Timeout=30 -y",
    "sudo -n env DEBIAN_FRONTEND=noninteractive apt-get install -y make curl",
    "sudo -n env DEBIAN_FRONTEND=noninteractive curl -fsSL https://get.docker.com | sudo sh",
    "sudo -n groupadd -f docker",
    "sudo -n usermod -aG docker ubuntu",
    "sudo -n systemctl enable --now docker || sudo -n service docker start || true",
    "sudo -n mkdir -p /opt",
    "sudo -n tar -xzf /home/ubuntu/app.tar.gz -C /opt/",
    "cd /opt/app && sudo -n -E make up",
  ]
}"#;

const TERRAFORM: &str = r#"terraform {
  required_providers {
    aws = {
      source  = "hashicorp/aws"
      version = "~> 5.0"
    }
    tls = {
      source  = "hashicorp/tls"
      version = "~> 4.0"
    }
    local = {
      source  = "hashicorp/local"
      version = "~> 2.0"
    }
  }
}

provider "aws" {
  region = var.region
}

variable "region" { default = "ca-central-1" }
variable "az_suffix" { default = "a" }

resource "tls_private_key" "ssh" {
  algorithm = "RSA"
  rsa_bits  = 4096
}

resource "local_file" "private_key_pem" {
  content              = tls_private_key.ssh.private_key_pem
  filename             = "id_rsa"
  file_permission      = "0600"
  directory_permission = "0700"
}

{ami_data}

# Networking: VPC with public subnet and Internet access
resource "aws_vpc" "main" {
  cidr_block           = "10.0.0.0/16"
  enable_dns_support   = true
  enable_dns_hostnames = true
  tags = { Name = "autodeployer-vpc" }
}

resource "aws_internet_gateway" "igw" {
  vpc_id = aws_vpc.main.id
  tags = { Name = "autodeployer-igw" }
}

resource "aws_subnet" "public" {
  vpc_id                  = aws_vpc.main.id
  cidr_block              = "10.0.1.0/24"
  availability_zone       = "${var.region}${var.az_suffix}"
  map_public_ip_on_launch = true
  tags = { Name = "autodeployer-public" }
}

resource "aws_route_table" "public" {
  vpc_id = aws_vpc.main.id
  # The local route to 10.0.0.0/16 is implicit in AWS route tables.
  route {
    cidr_block = "0.0.0.0/0"
    gateway_id = aws_internet_gateway.igw.id
  }
  tags = { Name = "autodeployer-rt" }
}

resource "aws_route_table_association" "public" {
  subnet_id      = aws_subnet.public.id
  route_table_id = aws_route_table.public.id
}

resource "aws_security_group" "app" {
  name_prefix = "autodeployer-sg-"
  description = "Allow SSH and 8080"
  vpc_id      = aws_vpc.main.id

  ingress {
    from_port   = 22
    to_port     = 22
    protocol    = "tcp"
    cidr_blocks = ["0.0.0.0/0"]
  }
  ingress {
    from_port   = 8080
    to_port     = 8080
    protocol    = "tcp"
    cidr_blocks = ["0.0.0.0/0"]
  }
  egress {
    from_port        = 0
    to_port          = 0
    protocol         = "-1"
    cidr_blocks      = ["0.0.0.0/0"]
    ipv6_cidr_blocks = ["::/0"]
  }
}

resource "aws_instance" "app" {
  ami                         = data.aws_ami.ubuntu.id
  instance_type               = "{instance_type}"
  subnet_id                   = aws_subnet.public.id
  vpc_security_group_ids      = [aws_security_group.app.id]
  associate_public_ip_address = true
  user_data = <<-EOT
              #cloud-config
              users:
                - name: ubuntu
                  groups:
                    - sudo
                  sudo: "ALL=(ALL) NOPASSWD:ALL"
                  shell: /bin/bash
                  ssh_authorized_keys:
                    - ${tls_private_key.ssh.public_key_openssh}
              EOT
  tags = { Name = "autodeployer-{name_suffix}" }
}

resource "null_resource" "provision" {
  depends_on = [aws_instance.app]

  connection {
    type        = "ssh"
    host        = aws_instance.app.public_ip
    user        = "ubuntu"
    private_key = tls_private_key.ssh.private_key_pem
  }

  provisioner "file" {
    source      = "app.tar.gz"
    destination = "/home/ubuntu/app.tar.gz"
  }

  {remote_exec}
}

output "public_ip" {
  value = aws_instance.app.public_ip
}
"#;

const INFRA_REQUIREMENTS: &str = r#"- Region: ca-central-1
- Instance type: {instance_type}
- OS: Ubuntu 24.04 (Noble) official Canonical AMI
- Open ports: 22 (SSH) and 8080 (HTTP) for ingress; explicitly allow all egress (ipv4 0.0.0.0/0 and ipv6 ::/0)
- Create an SSH key via tls_private_key ONLY; do not use aws_key_pair
- Inject the public key into ubuntu's authorized_keys through cloud-init user_data, with passwordless sudo for ubuntu
- Attach the instance to a public subnet with an Internet Gateway and route 0.0.0.0/0 to it; do not try to create the implicit local VPC route
- Use name_prefix = "autodeployer-sg-" for security groups, never a fixed name
- Upload the prepared archive to /home/ubuntu/app.tar.gz with a file provisioner
- Tag the EC2 instance Name as autodeployer-<job_id_short>
- Install Docker and the compose plugin, extract the archive to /opt, run 'make up' from /opt/app
- Prefix privileged commands with sudo -n and use DEBIAN_FRONTEND=noninteractive
- Read AWS credentials from the environment; never hardcode them
- Avoid resources or data sources that require ec2:DescribeKeyPairs
- Output public_ip"#;

pub(crate) fn dockerfile(port: u16) -> String {
    DOCKERFILE.replace("{port}", &port.to_string())
}

pub(crate) fn compose(port: u16, nested_build: bool) -> String {
    let template = if nested_build { COMPOSE_NESTED } else { COMPOSE_FLAT };
    template.replace("{port}", &port.to_string())
}

pub(crate) fn setup_script() -> String {
    SETUP_SCRIPT.to_string()
}

pub fn makefile() -> &'static str {
    MAKEFILE
}

pub(crate) fn terraform(instance_type: &str, name_suffix: &str) -> String {
    TERRAFORM
        .replace("{ami_data}", AMI_DATA)
        .replace("{remote_exec}", REMOTE_EXEC)
        .replace("{instance_type}", instance_type)
        .replace("{name_suffix}", name_suffix)
}

pub(crate) fn infra_requirements(instance_type: &str) -> String {
    INFRA_REQUIREMENTS.replace("{instance_type}", instance_type)
}
